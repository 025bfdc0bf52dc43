//! Runs against a live MySQL when `BLOGKIT_TEST_DB_USER` is set, e.g.
//! `BLOGKIT_TEST_DB_USER=root BLOGKIT_TEST_DB_PASSWORD=pw BLOGKIT_TEST_DB_NAME=test cargo test --test mysql`.

use blogkit::{next_id, now_ts, DbConfig, Entity, Field, FindAll, Model, Orm, Pool, SchemaDef};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Member {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    admin: Option<bool>,
    created_at: Option<f64>,
}

impl Entity for Member {
    fn schema() -> SchemaDef {
        SchemaDef::of::<Self>()
            .table("blogkit_test_members")
            .field(Field::string("id").primary_key().default_with(next_id))
            .field(Field::string("email"))
            .field(Field::string("name").default_value("anon"))
            .field(Field::boolean("admin"))
            .field(Field::float("created_at").default_with(now_ts))
    }
}

fn test_config() -> Option<DbConfig> {
    if std::env::var("BLOGKIT_TEST_DB_USER").is_err() {
        eprintln!("BLOGKIT_TEST_DB_USER not set; skipping");
        return None;
    }
    Some(DbConfig::from_env_with_prefix("BLOGKIT_TEST_DB_").unwrap())
}

async fn setup() -> Option<Orm> {
    setup_with(test_config()?).await
}

async fn setup_with(config: DbConfig) -> Option<Orm> {
    let pool = Pool::initialize(&config).await.unwrap();
    pool.execute(
        "create table if not exists `blogkit_test_members` (
            `id` varchar(50) not null primary key,
            `email` varchar(50),
            `name` varchar(50),
            `admin` boolean not null default false,
            `created_at` real not null
        )",
        &[],
        true,
    )
    .await
    .unwrap();
    let orm = Orm::new(pool);
    orm.register::<Member>().unwrap();
    Some(orm)
}

#[tokio::test]
async fn crud_round_trip() {
    let Some(orm) = setup().await else { return };

    let mut m = Member {
        email: Some("a@b.c".into()),
        ..Member::default()
    };
    m.save(&orm).await.unwrap();
    assert_eq!(m.name.as_deref(), Some("anon"));
    let id = m.id.clone().unwrap();

    let found = Member::find(&orm, id.as_str()).await.unwrap().unwrap();
    assert_eq!(found.email.as_deref(), Some("a@b.c"));
    assert_eq!(found.name.as_deref(), Some("anon"));
    assert_eq!(found.admin, Some(false));

    let mut changed = found;
    changed.name = Some("alice".into());
    changed.update(&orm).await.unwrap();
    let again = Member::find(&orm, id.as_str()).await.unwrap().unwrap();
    assert_eq!(again.name.as_deref(), Some("alice"));

    again.remove(&orm).await.unwrap();
    assert!(Member::find(&orm, id.as_str()).await.unwrap().is_none());
    orm.pool().close().await;
}

#[tokio::test]
async fn find_all_filters_orders_and_limits() {
    let Some(orm) = setup().await else { return };
    let tag = next_id().as_str().map(|s| s[15..27].to_string()).unwrap();
    for (i, kind) in ["x", "x", "x", "y"].iter().enumerate() {
        let mut m = Member {
            email: Some(format!("{}{}@{}", kind, tag, i)),
            created_at: Some(i as f64),
            ..Member::default()
        };
        m.save(&orm).await.unwrap();
    }
    let pattern = json!(format!("x{}@%", tag));

    let xs = Member::find_all(
        &orm,
        &FindAll::new()
            .filter("email like ?", vec![pattern.clone()])
            .order_by("created_at desc")
            .limit(2),
    )
    .await
    .unwrap();
    let emails: Vec<_> = xs.iter().filter_map(|m| m.email.clone()).collect();
    assert_eq!(emails, [format!("x{}@2", tag), format!("x{}@1", tag)]);

    let page = Member::find_all(
        &orm,
        &FindAll::new()
            .filter("email like ?", vec![pattern.clone()])
            .order_by("created_at")
            .limit_range(1, 2),
    )
    .await
    .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].email, Some(format!("x{}@1", tag)));

    let n = Member::find_number(&orm, "count(id)", Some("email like ?"), &[pattern])
        .await
        .unwrap();
    assert_eq!(n.and_then(|v| v.as_i64()), Some(3));
    orm.pool().close().await;
}

#[tokio::test]
async fn failed_statement_without_autocommit_surfaces_error() {
    let Some(orm) = setup().await else { return };
    let pool = orm.pool();
    let sql = "insert into `blogkit_test_members` (`id`, `created_at`) values (?, ?)";
    let id = next_id();
    let args = [id.clone(), Value::from(1.0)];
    assert_eq!(pool.execute(sql, &args, false).await.unwrap(), 1);
    assert!(pool.execute(sql, &args, false).await.is_err());
    let rows = pool
        .query("select `id` from `blogkit_test_members` where `id` = ?", &[id], None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    pool.close().await;
}

#[tokio::test]
async fn find_number_decodes_decimal_aggregates() {
    let Some(orm) = setup().await else { return };
    let tag = next_id().as_str().map(|s| s[15..27].to_string()).unwrap();
    for i in 0..3 {
        let mut m = Member {
            email: Some(format!("d{}@{}", tag, i)),
            created_at: Some(i as f64),
            ..Member::default()
        };
        m.save(&orm).await.unwrap();
    }
    let pattern = [json!(format!("d{}@%", tag))];

    // sum and avg over integers are DECIMAL in MySQL.
    let sum = Member::find_number(&orm, "sum(1)", Some("email like ?"), &pattern)
        .await
        .unwrap();
    assert_eq!(sum.and_then(|v| v.as_i64()), Some(3));
    let avg = Member::find_number(&orm, "avg(cast(created_at as signed))", Some("email like ?"), &pattern)
        .await
        .unwrap();
    assert_eq!(avg.and_then(|v| v.as_f64()), Some(1.0));
    let half = Member::find_number(&orm, "sum(cast(created_at as decimal(6,2))) / 4", Some("email like ?"), &pattern)
        .await
        .unwrap();
    assert_eq!(half.and_then(|v| v.as_f64()), Some(0.75));
    orm.pool().close().await;
}

#[tokio::test]
async fn orm_writes_commit_when_autocommit_is_off() {
    let Some(mut config) = test_config() else { return };
    config.autocommit = false;
    let orm = setup_with(config).await.unwrap();
    assert!(!orm.pool().autocommit());

    let mut m = Member {
        email: Some("nocommit@b.c".into()),
        ..Member::default()
    };
    m.save(&orm).await.unwrap();
    let id = m.id.clone().unwrap();

    // A separate autocommit pool only sees committed rows.
    let reader = setup().await.unwrap();
    let seen = Member::find(&reader, id.as_str()).await.unwrap().unwrap();
    assert_eq!(seen.email.as_deref(), Some("nocommit@b.c"));

    seen.remove(&orm).await.unwrap();
    assert!(Member::find(&reader, id.as_str()).await.unwrap().is_none());
    orm.pool().close().await;
    reader.pool().close().await;
}

#[tokio::test]
async fn failed_execute_leaves_no_open_transaction() {
    let Some(mut config) = test_config() else { return };
    config.autocommit = false;
    config.min_size = 1;
    config.max_size = 1;
    let orm = setup_with(config).await.unwrap();
    let pool = orm.pool();
    let sql = "insert into `blogkit_test_members` (`id`, `created_at`) values (?, ?)";
    let args = [next_id(), Value::from(1.0)];
    assert_eq!(pool.execute(sql, &args, false).await.unwrap(), 1);
    assert!(pool.execute(sql, &args, false).await.is_err());

    // Only one connection, so this runs on the one that failed.
    let rows = pool
        .query(
            "select count(*) as n from information_schema.innodb_trx where trx_mysql_thread_id = connection_id()",
            &[],
            None,
        )
        .await
        .unwrap();
    assert_eq!(rows[0]["n"].as_i64(), Some(0));
    pool.close().await;
}
