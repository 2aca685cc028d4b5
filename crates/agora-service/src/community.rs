use crate::{account::AccountWithFollowers, context::Context, DEFAULT_RESULT_LIMIT};
use agora_db::model::community::{Community, CommunityChangeset, NewCommunity};
use agora_error::{bail, Error, ErrorType, OptionExt, Result};
use agora_store::{AnyStore, MembershipState, StoreBackend};
use ahash::AHashSet;
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use typed_builder::TypedBuilder;
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEntry {
    #[serde(flatten)]
    pub community: Community,
    pub members_count: u64,
    pub joined_by_me: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityDetails {
    #[serde(flatten)]
    pub community: Community,
    pub members_count: u64,
    pub joined_by_me: bool,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularCommunity {
    pub community_id: Uuid,
    pub community_name: String,
    pub members_count: u64,
}

#[derive(Clone, Debug, Deserialize, TypedBuilder, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunity {
    #[builder(setter(into))]
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[builder(default, setter(strip_option))]
    #[garde(length(chars, max = MAX_DESCRIPTION_LENGTH))]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize, TypedBuilder, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommunity {
    #[garde(skip)]
    pub community_id: Uuid,
    #[builder(setter(into))]
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[builder(setter(into))]
    #[garde(length(chars, max = MAX_DESCRIPTION_LENGTH))]
    pub description: String,
    #[builder(default, setter(strip_option))]
    #[garde(skip)]
    pub image: Option<String>,
    #[builder(default, setter(strip_option))]
    #[garde(skip)]
    pub banner_image: Option<String>,
}

#[derive(Clone, TypedBuilder)]
pub struct CommunityService {
    store: AnyStore,
    #[builder(default = DEFAULT_RESULT_LIMIT)]
    popular_limit: usize,
}

impl CommunityService {
    /// Every community, flagged with whether the caller is a member
    pub async fn list(&self, ctx: Context) -> Result<Vec<CommunityEntry>> {
        let (communities, memberships) = tokio::try_join!(
            self.store.communities(),
            self.store.memberships_of(ctx.account_id),
        )?;

        let joined: AHashSet<Uuid> = memberships
            .iter()
            .map(|membership| membership.community_id)
            .collect();

        Ok(communities
            .into_iter()
            .map(|counted| CommunityEntry {
                joined_by_me: joined.contains(&counted.item.id),
                community: counted.item,
                members_count: counted.count,
            })
            .collect())
    }

    pub async fn get_by_id(&self, ctx: Context, id: Uuid) -> Result<CommunityDetails> {
        let (community, membership) = tokio::try_join!(
            self.store.community_by_id(id),
            self.store.membership(ctx.account_id, id),
        )?;
        let community = community.or_not_found("community")?;

        Ok(CommunityDetails {
            community: community.item,
            members_count: community.count,
            joined_by_me: membership.is_some(),
            is_admin: membership.is_some_and(|membership| membership.is_admin()),
        })
    }

    pub async fn members(&self, id: Uuid) -> Result<Vec<AccountWithFollowers>> {
        self.store
            .community_by_id(id)
            .await?
            .or_not_found("community")?;

        let members = self.store.members(id).await?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    /// Create a community with the caller as its administrator
    #[instrument(skip_all, fields(account_id = %ctx.account_id))]
    pub async fn create(&self, ctx: Context, create: CreateCommunity) -> Result<Community> {
        create.validate().map_err(Error::validation)?;

        let community = NewCommunity {
            id: Uuid::now_v7(),
            name: create.name,
            description: create.description,
        };

        self.store.insert_community(community, ctx.account_id).await
    }

    /// Communities with the most members, largest first
    pub async fn popular(&self) -> Result<Vec<PopularCommunity>> {
        let communities = self.store.popular_communities(self.popular_limit).await?;

        Ok(communities
            .into_iter()
            .map(|counted| PopularCommunity {
                community_id: counted.item.id,
                community_name: counted.item.name,
                members_count: counted.count,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn toggle_membership(&self, ctx: Context, id: Uuid) -> Result<MembershipState> {
        self.store
            .community_by_id(id)
            .await?
            .or_not_found("community")?;

        let state = self.store.toggle_membership(ctx.account_id, id).await?;
        debug!(?state, "toggled membership");

        Ok(state)
    }

    /// Modify the community
    ///
    /// Only administrators of the community are allowed to do this
    #[instrument(skip_all, fields(account_id = %ctx.account_id, community_id = %update.community_id))]
    pub async fn update(&self, ctx: Context, update: UpdateCommunity) -> Result<Community> {
        update.validate().map_err(Error::validation)?;

        let membership = self
            .store
            .membership(ctx.account_id, update.community_id)
            .await?;
        if !membership.is_some_and(|membership| membership.is_admin()) {
            bail!(
                type = ErrorType::Forbidden(Some(
                    "you don't have permissions to modify this community".into()
                )),
                "caller isn't an administrator of the community"
            );
        }

        let changeset = CommunityChangeset {
            name: Some(update.name),
            description: Some(update.description),
            image: update.image,
            banner_image: update.banner_image,
            updated_at: OffsetDateTime::now_utc(),
        };

        self.store
            .update_community(update.community_id, changeset)
            .await
    }
}
