#![forbid(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

use agora_config::database::PostgresConfiguration;
use agora_error::{Error, Result};
use diesel::Connection;
use diesel_async::{
    async_connection_wrapper::AsyncConnectionWrapper,
    pooled_connection::{bb8::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type PgPool = Pool<AsyncPgConnection>;

#[doc(hidden)]
pub use diesel_async;

mod error;

pub mod model;
#[allow(clippy::wildcard_imports)]
pub mod schema;
pub mod types;

pub use self::error::EnumConversionError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Run the code with a connection from the pool
///
/// The pool error is propagated with `?`, the result of the block is returned as-is
#[macro_export]
macro_rules! with_connection {
    ($pool:expr, |$conn_name:ident| $code:block) => {{
        let mut conn = $pool.get().await?;
        let $conn_name = &mut *conn;
        async { $code }.await
    }};
}

/// Run the code inside of a database transaction
///
/// The transaction is rolled back if the block returns an error
#[macro_export]
macro_rules! with_transaction {
    ($pool:expr, |$conn_name:ident| $code:block) => {{
        use $crate::diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};

        let mut conn = $pool.get().await?;
        conn.transaction(|$conn_name| async move { $code }.scope_boxed())
            .await
    }};
}

/// Connect to the database and run any pending migrations
#[instrument(skip_all, fields(max_connections = config.max_connections))]
pub async fn connect(config: &PostgresConfiguration) -> Result<PgPool> {
    let conn_str = config.url.to_string();

    tokio::task::spawn_blocking({
        let conn_str = conn_str.clone();

        move || {
            let mut migration_conn =
                AsyncConnectionWrapper::<AsyncPgConnection>::establish(conn_str.as_str())?;

            let applied = migration_conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(Error::msg)?;

            if !applied.is_empty() {
                info!(count = applied.len(), "applied pending migrations");
            }

            Ok::<_, Error>(())
        }
    })
    .await??;

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .build(AsyncDieselConnectionManager::new(conn_str))
        .await?;

    Ok(pool)
}
