use crate::state::Zustand;
use agora_db::model::account::Account;
use agora_error::{Error, ErrorType, Result, ResultExt};
use agora_service::Context;
use agora_store::StoreBackend;
use axum::{extract::FromRequestParts, RequestPartsExt};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;

/// Resolve the bearer session token of the request to its account
///
/// Missing, unknown and expired tokens are rejected as unauthorized
pub struct AuthExtractor(pub Account);

impl AuthExtractor {
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new(self.0.id)
    }
}

impl FromRequestParts<Zustand> for AuthExtractor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &Zustand) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .with_error_type(ErrorType::Unauthorized)?;

        let Some(account) = state.store.account_by_session(bearer.token()).await? else {
            return Err(Error::msg("invalid or expired session").with_error_type(ErrorType::Unauthorized));
        };

        Ok(Self(account))
    }
}
