//! Blog site handlers and their route annotations.

use crate::models::{Blog, User};
use crate::page::{page_index, Page};
use blogkit::{get, post, ApiError, AppError, Args, Endpoint, FindAll, Model, Orm, Param, RequestContext};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Header carrying the signed-in user's id.
///
/// The app does no authentication of its own: this header is only meaningful
/// behind a reverse proxy that authenticates the session, strips any
/// client-supplied `x-user-id`, and sets its own. Never expose the app directly.
pub const USER_HEADER: &str = "x-user-id";

const PAGE_SIZE: u64 = 10;

pub async fn index(orm: Arc<Orm>, _args: Args) -> Result<Value, AppError> {
    let blogs = Blog::find_all(&orm, &FindAll::new().order_by("created_at desc").limit(PAGE_SIZE)).await?;
    Ok(json!({ "blogs": blogs }))
}

pub async fn api_users(orm: Arc<Orm>, args: Args) -> Result<Value, AppError> {
    let count = count::<User>(&orm).await?;
    let page = Page::new(count, page_index(args.str("page")), PAGE_SIZE);
    if page.limit == 0 {
        return Ok(json!({ "page": page, "users": [] }));
    }
    let mut users = User::find_all(
        &orm,
        &FindAll::new()
            .order_by("created_at desc")
            .limit_range(page.offset, page.limit),
    )
    .await?;
    for u in &mut users {
        u.passwd = Some("******".into());
    }
    Ok(json!({ "page": page, "users": users }))
}

pub async fn api_blogs(orm: Arc<Orm>, args: Args) -> Result<Value, AppError> {
    let count = count::<Blog>(&orm).await?;
    let page = Page::new(count, page_index(args.str("page")), PAGE_SIZE);
    if page.limit == 0 {
        return Ok(json!({ "page": page, "blogs": [] }));
    }
    let blogs = Blog::find_all(
        &orm,
        &FindAll::new()
            .order_by("created_at desc")
            .limit_range(page.offset, page.limit),
    )
    .await?;
    Ok(json!({ "page": page, "blogs": blogs }))
}

pub async fn api_get_blog(orm: Arc<Orm>, args: Args) -> Result<Value, AppError> {
    let id = args.required_str("id")?;
    match Blog::find(&orm, id).await? {
        Some(blog) => Ok(json!(blog)),
        None => Err(ApiError::not_found("blog", format!("blog {} not found", id)).into()),
    }
}

pub async fn api_create_blog(orm: Arc<Orm>, args: Args) -> Result<Value, AppError> {
    let user = require_admin(&orm, &args).await?;
    let name = non_empty(&args, "name")?;
    let summary = non_empty(&args, "summary")?;
    let content = non_empty(&args, "content")?;
    let mut blog = Blog {
        user_id: user.id,
        user_name: user.name,
        user_image: user.image,
        name: Some(name),
        summary: Some(summary),
        content: Some(content),
        ..Blog::default()
    };
    blog.save(&orm).await?;
    tracing::info!(id = ?blog.id, "blog created");
    Ok(json!(blog))
}

pub async fn api_delete_blog(orm: Arc<Orm>, args: Args) -> Result<Value, AppError> {
    require_admin(&orm, &args).await?;
    let id = args.required_str("id")?;
    let blog = Blog::find(&orm, id)
        .await?
        .ok_or_else(|| ApiError::not_found("blog", format!("blog {} not found", id)))?;
    blog.remove(&orm).await?;
    Ok(json!({ "id": id }))
}

async fn count<T: Model>(orm: &Orm) -> Result<u64, AppError> {
    let n = T::find_number(orm, "count(id)", None, &[]).await?;
    Ok(n.and_then(|v| v.as_u64()).unwrap_or(0))
}

/// User id asserted by the trusted proxy. See [`USER_HEADER`].
fn signed_in_user(ctx: &RequestContext) -> Option<&str> {
    ctx.header(USER_HEADER).map(str::trim).filter(|id| !id.is_empty())
}

async fn require_admin(orm: &Orm, args: &Args) -> Result<User, AppError> {
    let user_id = args
        .request()
        .and_then(signed_in_user)
        .ok_or_else(|| ApiError::permission("sign in required"))?;
    match User::find(orm, user_id).await? {
        Some(user) if user.admin == Some(true) => Ok(user),
        _ => Err(ApiError::permission("admin only").into()),
    }
}

fn non_empty(args: &Args, name: &str) -> Result<String, AppError> {
    match args.str(name).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::value_error(name, format!("{} cannot be empty.", name)).into()),
    }
}

fn with_orm<F, Fut>(orm: &Arc<Orm>, f: F) -> impl Fn(Args) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<Orm>, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
{
    let orm = orm.clone();
    move |args| f(orm.clone(), args)
}

/// Every handler of the site, annotated with its method and path.
pub fn endpoints(orm: &Arc<Orm>) -> Vec<Endpoint> {
    vec![
        get("/").param(Param::request()).to(with_orm(orm, index)).name("index"),
        get("/api/users")
            .param(Param::keyword_or("page", "1"))
            .to(with_orm(orm, api_users))
            .name("api_users"),
        get("/api/blogs")
            .param(Param::keyword_or("page", "1"))
            .to(with_orm(orm, api_blogs))
            .name("api_blogs"),
        get("/api/blogs/{id}")
            .param(Param::positional("id"))
            .to(with_orm(orm, api_get_blog))
            .name("api_get_blog"),
        post("/api/blogs")
            .params([
                Param::request(),
                Param::keyword("name"),
                Param::keyword("summary"),
                Param::keyword("content"),
            ])
            .to(with_orm(orm, api_create_blog))
            .name("api_create_blog"),
        post("/api/blogs/{id}/delete")
            .params([Param::positional("id"), Param::request()])
            .to(with_orm(orm, api_delete_blog))
            .name("api_delete_blog"),
    ]
}
