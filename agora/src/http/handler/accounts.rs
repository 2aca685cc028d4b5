use super::Toggled;
use crate::http::extractor::{AuthExtractor, Json};
use agora_db::model::account::Account;
use agora_error::Result;
use agora_service::account::{AccountProfile, AccountService, Follows, UpdateAccount};
use agora_store::FollowState;
use axum::extract::{Path, State};
use uuid::Uuid;

pub async fn me(
    State(account_service): State<AccountService>,
    auth: AuthExtractor,
) -> Result<Json<Account>> {
    Ok(Json(account_service.me(auth.context()).await?))
}

pub async fn update_me(
    State(account_service): State<AccountService>,
    auth: AuthExtractor,
    Json(update): Json<UpdateAccount>,
) -> Result<Json<Account>> {
    Ok(Json(account_service.update(auth.context(), update).await?))
}

pub async fn get(
    State(account_service): State<AccountService>,
    auth: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountProfile>> {
    Ok(Json(account_service.get_by_id(auth.context(), id).await?))
}

pub async fn follows(
    State(account_service): State<AccountService>,
    _: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<Follows>> {
    Ok(Json(account_service.follows(id).await?))
}

pub async fn follow(
    State(account_service): State<AccountService>,
    auth: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<Toggled<FollowState>>> {
    let state = account_service.toggle_follow(auth.context(), id).await?;
    Ok(Json(Toggled { state }))
}
