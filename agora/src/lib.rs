#![forbid(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

pub mod http;
pub mod signal;
pub mod state;

use self::state::Zustand;
use agora_config::{database, Configuration};
use agora_storage::fs::Storage;
use agora_store::{AnyStore, InMemoryStore, PgStore};
use color_eyre::eyre::{self, Context};
use std::path::PathBuf;

async fn prepare_store(config: &database::Configuration) -> eyre::Result<AnyStore> {
    let store = match config {
        database::Configuration::Postgres(postgres_config) => {
            let db_pool = agora_db::connect(postgres_config)
                .await
                .map_err(agora_error::Error::into_error)
                .wrap_err("Failed to connect to and migrate the database")?;

            PgStore::builder().db_pool(db_pool).build().into()
        }
        database::Configuration::InMemory => {
            warn!("using the in-memory store, all data is lost on shutdown");
            InMemoryStore::new().into()
        }
    };

    Ok(store)
}

pub async fn initialise_state(config: &Configuration) -> eyre::Result<Zustand> {
    let store = prepare_store(&config.database).await?;

    let storage = Storage::new(PathBuf::from(config.storage.upload_dir.as_str()));
    storage
        .ensure_dir()
        .await
        .map_err(eyre::Report::msg)
        .wrap_err("Failed to create the upload directory")?;

    Ok(Zustand::prepare(config, store, storage))
}
