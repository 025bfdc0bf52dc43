//! Shared application state for routes that need the database.

use crate::orm::Orm;
use crate::pool::Pool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orm: Arc<Orm>,
}

impl AppState {
    pub fn new(orm: Orm) -> Self {
        AppState { orm: Arc::new(orm) }
    }

    pub fn pool(&self) -> &Pool {
        self.orm.pool()
    }
}
