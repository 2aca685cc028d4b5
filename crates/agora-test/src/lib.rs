use agora_config::database::PostgresConfiguration;
use agora_db::{with_connection, PgPool};
use diesel_async::RunQueryDsl;
use futures_util::{Future, FutureExt};
use std::{
    env,
    error::Error,
    panic::{self, AssertUnwindSafe},
};

pub mod fixtures;

type BoxError = Box<dyn Error + Send + Sync>;

/// Run the test against a fresh database schema
///
/// The schema is dropped after the test ran, even if it panicked.
/// Panics if `DATABASE_URL` isn't set, tests using this are expected to be `#[ignore]`d by default.
pub async fn database_test<F, Fut>(func: F)
where
    F: FnOnce(PgPool) -> Fut,
    Fut: Future<Output = ()>,
{
    let db_url = env::var("DATABASE_URL").expect("Missing database URL");

    let pool = agora_db::connect(&PostgresConfiguration {
        url: db_url.into(),
        max_connections: 10,
    })
    .await
    .expect("Failed to connect to database");

    let out = AssertUnwindSafe(func(pool.clone())).catch_unwind().await;

    let cleanup: Result<(), BoxError> = async {
        with_connection!(pool, |db_conn| {
            diesel::sql_query("DROP SCHEMA public CASCADE")
                .execute(db_conn)
                .await?;

            diesel::sql_query("CREATE SCHEMA public")
                .execute(db_conn)
                .await?;

            Ok(())
        })
    }
    .await;
    cleanup.expect("Failed to reset schema");

    if let Err(err) = out {
        panic::resume_unwind(err);
    }
}
