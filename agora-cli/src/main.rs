use self::{account::AccountSubcommand, config::Configuration, session::SessionSubcommand};
use agora_config::database::PostgresConfiguration;
use agora_error::Error;
use agora_store::{AnyStore, PgStore};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, Context};

mod account;
mod config;
mod search;
mod session;

#[derive(Subcommand)]
enum AppSubcommand {
    /// Manage accounts
    #[clap(subcommand)]
    Account(AccountSubcommand),

    /// Search accounts and communities the same way the API does
    Search {
        /// Phrase contained in the names
        phrase: String,
    },

    /// Manage login sessions
    #[clap(subcommand)]
    Session(SessionSubcommand),
}

/// CLI for the Agora server
#[derive(Parser)]
#[command(about, author, version)]
struct App {
    #[clap(subcommand)]
    subcommand: AppSubcommand,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config: Configuration = envy::from_env().wrap_err("Failed to read the environment")?;
    let db_pool = agora_db::connect(&PostgresConfiguration {
        url: config.database_url,
        max_connections: config.database_max_connections,
    })
    .await
    .map_err(Error::into_error)
    .wrap_err("Failed to connect to the database")?;

    let store: AnyStore = PgStore::builder().db_pool(db_pool).build().into();
    let cmd = App::parse();

    match cmd.subcommand {
        AppSubcommand::Account(cmd) => self::account::handle(cmd, store).await?,
        AppSubcommand::Search { phrase } => self::search::handle(&phrase, store).await?,
        AppSubcommand::Session(cmd) => self::session::handle(cmd, store).await?,
    }

    Ok(())
}
