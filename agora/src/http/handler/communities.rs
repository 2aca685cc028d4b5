use super::Toggled;
use crate::http::extractor::{AuthExtractor, Json};
use agora_db::model::community::Community;
use agora_error::Result;
use agora_service::{
    account::AccountWithFollowers,
    community::{
        CommunityDetails, CommunityEntry, CommunityService, CreateCommunity, PopularCommunity,
        UpdateCommunity,
    },
};
use agora_store::MembershipState;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateForm {
    name: String,
    description: String,
    image: Option<String>,
    banner_image: Option<String>,
}

pub async fn list(
    State(community_service): State<CommunityService>,
    auth: AuthExtractor,
) -> Result<Json<Vec<CommunityEntry>>> {
    Ok(Json(community_service.list(auth.context()).await?))
}

pub async fn create(
    State(community_service): State<CommunityService>,
    auth: AuthExtractor,
    Json(create): Json<CreateCommunity>,
) -> Result<Json<Community>> {
    Ok(Json(community_service.create(auth.context(), create).await?))
}

pub async fn popular(
    State(community_service): State<CommunityService>,
    _: AuthExtractor,
) -> Result<Json<Vec<PopularCommunity>>> {
    Ok(Json(community_service.popular().await?))
}

pub async fn get(
    State(community_service): State<CommunityService>,
    auth: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<CommunityDetails>> {
    Ok(Json(community_service.get_by_id(auth.context(), id).await?))
}

pub async fn update(
    State(community_service): State<CommunityService>,
    auth: AuthExtractor,
    Path(id): Path<Uuid>,
    Json(form): Json<UpdateForm>,
) -> Result<Json<Community>> {
    let update = UpdateCommunity {
        community_id: id,
        name: form.name,
        description: form.description,
        image: form.image,
        banner_image: form.banner_image,
    };

    Ok(Json(community_service.update(auth.context(), update).await?))
}

pub async fn members(
    State(community_service): State<CommunityService>,
    _: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AccountWithFollowers>>> {
    Ok(Json(community_service.members(id).await?))
}

pub async fn membership(
    State(community_service): State<CommunityService>,
    auth: AuthExtractor,
    Path(id): Path<Uuid>,
) -> Result<Json<Toggled<MembershipState>>> {
    let state = community_service
        .toggle_membership(auth.context(), id)
        .await?;

    Ok(Json(Toggled { state }))
}
