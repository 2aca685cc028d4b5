use agora_error::Error;
use agora_service::account::{AccountService, CreateAccount};
use agora_store::AnyStore;
use clap::Subcommand;
use color_eyre::eyre;

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Create a new account and print its ID
    Create {
        /// Display name of the account
        name: String,

        /// Contact address of the account
        #[arg(long)]
        email: Option<String>,
    },
}

async fn create(store: AnyStore, name: String, email: Option<String>) -> eyre::Result<()> {
    let account_service = AccountService::builder().store(store).build();
    let account = account_service
        .create(CreateAccount { name, email })
        .await
        .map_err(Error::into_error)?;

    println!("{}", account.id);

    Ok(())
}

pub async fn handle(cmd: AccountSubcommand, store: AnyStore) -> eyre::Result<()> {
    match cmd {
        AccountSubcommand::Create { name, email } => create(store, name, email).await?,
    }

    Ok(())
}
