//! Blog site server.
//!
//! Run from repo root: `cargo run -p blog-app`
//! Config is read from `config_default.json` / `config_override.json` in `BLOG_CONFIG_DIR` (default `blog_app`).

mod handlers;
mod models;
mod page;

use blogkit::{common_routes_with_ready, init_tracing, AppConfig, AppState, Orm, Pool, RouteTable};
use models::{Blog, User};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("blogkit=info,blog_app=info");

    let dir = std::env::var("BLOG_CONFIG_DIR").unwrap_or_else(|_| "blog_app".into());
    let config = AppConfig::load(&dir).await?;
    let pool = Pool::initialize(&config.db).await?;
    let orm = Orm::new(pool.clone());
    orm.register::<User>()?;
    orm.register::<Blog>()?;
    let state = AppState::new(orm);

    let mut table = RouteTable::new().body_limit(config.server.body_limit);
    let added = table.add_routes(handlers::endpoints(&state.orm))?;
    tracing::info!(routes = added, "routes registered");
    let app = table.into_router().merge(common_routes_with_ready(state));

    let listener = TcpListener::bind(&config.server.bind).await?;
    tracing::info!("server started at http://{}...", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    pool.close().await;
    Ok(())
}
