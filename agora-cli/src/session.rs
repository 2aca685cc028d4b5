use agora_db::model::session::NewSession;
use agora_error::OptionExt;
use agora_store::{AnyStore, StoreBackend};
use clap::Subcommand;
use color_eyre::eyre;
use rand::{distributions::Alphanumeric, Rng};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const TOKEN_LENGTH: usize = 48;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Issue a bearer token for an account
    Issue {
        /// ID of the account the session belongs to
        account_id: Uuid,

        /// Number of days until the token expires
        #[arg(long, default_value_t = 30)]
        days: u16,
    },
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

async fn issue(store: AnyStore, account_id: Uuid, days: u16) -> eyre::Result<()> {
    store
        .account_by_id(account_id)
        .await
        .and_then(|account| account.or_not_found("account"))
        .map_err(agora_error::Error::into_error)?;

    let token = generate_token();
    store
        .insert_session(NewSession {
            token: token.clone(),
            account_id,
            expires_at: OffsetDateTime::now_utc() + Duration::days(i64::from(days)),
        })
        .await
        .map_err(agora_error::Error::into_error)?;

    println!("{token}");

    Ok(())
}

pub async fn handle(cmd: SessionSubcommand, store: AnyStore) -> eyre::Result<()> {
    match cmd {
        SessionSubcommand::Issue { account_id, days } => issue(store, account_id, days).await?,
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{generate_token, TOKEN_LENGTH};

    #[test]
    fn tokens_are_alphanumeric() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }
}
