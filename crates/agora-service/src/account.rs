use crate::context::Context;
use agora_db::model::account::{Account, AccountChangeset, NewAccount};
use agora_error::{bail, Error, ErrorType, OptionExt, Result};
use agora_store::{AnyStore, Counted, FollowState, StoreBackend};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use typed_builder::TypedBuilder;
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_BIO_LENGTH: usize = 150;

/// Account together with the number of accounts following it
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWithFollowers {
    #[serde(flatten)]
    pub account: Account,
    pub followers_count: u64,
}

impl From<Counted<Account>> for AccountWithFollowers {
    fn from(value: Counted<Account>) -> Self {
        Self {
            account: value.item,
            followers_count: value.count,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    #[serde(flatten)]
    pub account: Account,
    pub followers_count: u64,
    pub following_count: u64,
    pub followed_by_me: bool,
}

/// Entry of a follower or following list
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FollowEntry {
    #[serde(flatten)]
    pub account: Account,
    pub followers: u64,
}

impl From<Counted<Account>> for FollowEntry {
    fn from(value: Counted<Account>) -> Self {
        Self {
            account: value.item,
            followers: value.count,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Follows {
    pub followers: Vec<FollowEntry>,
    pub following: Vec<FollowEntry>,
}

#[derive(Clone, Debug, Deserialize, TypedBuilder, Validate)]
pub struct CreateAccount {
    #[builder(setter(into))]
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[builder(default, setter(strip_option))]
    #[garde(length(min = 3))]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize, TypedBuilder, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccount {
    #[builder(setter(into))]
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[builder(setter(into))]
    #[garde(length(chars, max = MAX_BIO_LENGTH))]
    pub bio: String,
    #[builder(default, setter(strip_option))]
    #[garde(skip)]
    pub image: Option<String>,
    #[builder(default, setter(strip_option))]
    #[garde(skip)]
    pub banner_image: Option<String>,
}

#[derive(Clone, TypedBuilder)]
pub struct AccountService {
    store: AnyStore,
}

impl AccountService {
    #[instrument(skip_all)]
    pub async fn create(&self, create: CreateAccount) -> Result<Account> {
        create.validate().map_err(Error::validation)?;

        self.store
            .insert_account(NewAccount {
                id: Uuid::now_v7(),
                name: create.name,
                email: create.email,
                bio: None,
                image: None,
                banner_image: None,
            })
            .await
    }

    /// Account of the caller
    pub async fn me(&self, ctx: Context) -> Result<Account> {
        self.store
            .account_by_id(ctx.account_id)
            .await?
            .or_not_found("account")
    }

    pub async fn get_by_id(&self, ctx: Context, id: Uuid) -> Result<AccountProfile> {
        let account = self.store.account_by_id(id).await?.or_not_found("account")?;
        let (counts, followed_by_me) = tokio::try_join!(
            self.store.follow_counts(id),
            self.store.is_following(ctx.account_id, id),
        )?;

        Ok(AccountProfile {
            account,
            followers_count: counts.followers,
            following_count: counts.following,
            followed_by_me,
        })
    }

    pub async fn follows(&self, id: Uuid) -> Result<Follows> {
        self.store.account_by_id(id).await?.or_not_found("account")?;
        let (followers, following) =
            tokio::try_join!(self.store.followers(id), self.store.following(id))?;

        Ok(Follows {
            followers: followers.into_iter().map(Into::into).collect(),
            following: following.into_iter().map(Into::into).collect(),
        })
    }

    /// Follow the account if the caller doesn't follow it yet, unfollow it otherwise
    #[instrument(skip(self))]
    pub async fn toggle_follow(&self, ctx: Context, target: Uuid) -> Result<FollowState> {
        if ctx.account_id == target {
            bail!(
                type = ErrorType::BadRequest(Some("cannot follow yourself".into())),
                "cannot follow yourself"
            );
        }

        self.store
            .account_by_id(target)
            .await?
            .or_not_found("account")?;

        let state = self.store.toggle_follow(ctx.account_id, target).await?;
        debug!(?state, "toggled follow");

        Ok(state)
    }

    #[instrument(skip_all, fields(account_id = %ctx.account_id))]
    pub async fn update(&self, ctx: Context, update: UpdateAccount) -> Result<Account> {
        update.validate().map_err(Error::validation)?;

        let changeset = AccountChangeset {
            name: Some(update.name),
            bio: Some(update.bio),
            image: update.image,
            banner_image: update.banner_image,
            updated_at: OffsetDateTime::now_utc(),
        };

        self.store.update_account(ctx.account_id, changeset).await
    }
}

#[cfg(test)]
mod test {
    use super::{AccountService, CreateAccount, UpdateAccount};
    use crate::context::Context;
    use agora_error::ErrorType;
    use agora_store::FollowState;
    use agora_test::fixtures;
    use pretty_assertions::assert_eq;
    use sonic_rs::JsonValueTrait;
    use uuid::Uuid;

    #[tokio::test]
    async fn toggle_follow_twice() {
        let store = fixtures::store();
        let alice = fixtures::account(&store, "alice").await;
        let bob = fixtures::account(&store, "bob").await;
        let account_service = AccountService::builder().store(store).build();
        let ctx = Context::new(alice.id);

        assert_eq!(
            account_service.toggle_follow(ctx, bob.id).await.unwrap(),
            FollowState::Following
        );
        let profile = account_service.get_by_id(ctx, bob.id).await.unwrap();
        assert!(profile.followed_by_me);
        assert_eq!(profile.followers_count, 1);

        assert_eq!(
            account_service.toggle_follow(ctx, bob.id).await.unwrap(),
            FollowState::NotFollowing
        );
        let profile = account_service.get_by_id(ctx, bob.id).await.unwrap();
        assert!(!profile.followed_by_me);
        assert_eq!(profile.followers_count, 0);
    }

    #[tokio::test]
    async fn self_follow_always_fails() {
        let store = fixtures::store();
        let alice = fixtures::account(&store, "alice").await;
        let account_service = AccountService::builder().store(store).build();
        let ctx = Context::new(alice.id);

        for _ in 0..2 {
            let error = account_service
                .toggle_follow(ctx, alice.id)
                .await
                .unwrap_err();
            assert_eq!(
                *error.error_type(),
                ErrorType::BadRequest(Some("cannot follow yourself".into()))
            );
        }
    }

    #[tokio::test]
    async fn unknown_accounts() {
        let store = fixtures::store();
        let alice = fixtures::account(&store, "alice").await;
        let account_service = AccountService::builder().store(store).build();
        let ctx = Context::new(alice.id);

        let error = account_service
            .toggle_follow(ctx, Uuid::now_v7())
            .await
            .unwrap_err();
        assert_eq!(*error.error_type(), ErrorType::NotFound);

        let error = account_service
            .get_by_id(ctx, Uuid::now_v7())
            .await
            .unwrap_err();
        assert_eq!(*error.error_type(), ErrorType::NotFound);

        let error = account_service.follows(Uuid::now_v7()).await.unwrap_err();
        assert_eq!(*error.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn follows_lists_both_directions() {
        let store = fixtures::store();
        let alice = fixtures::account(&store, "alice").await;
        let bob = fixtures::account(&store, "bob").await;
        fixtures::followers(&store, bob.id, 3).await;
        let account_service = AccountService::builder().store(store).build();

        account_service
            .toggle_follow(Context::new(alice.id), bob.id)
            .await
            .unwrap();

        let follows = account_service.follows(alice.id).await.unwrap();
        assert!(follows.followers.is_empty());
        assert_eq!(follows.following.len(), 1);
        assert_eq!(follows.following[0].account.id, bob.id);
        assert_eq!(follows.following[0].followers, 4);

        let json = sonic_rs::to_value(&follows.following[0]).unwrap();
        assert_eq!(json["followers"].as_u64(), Some(4));
        assert_eq!(json["name"].as_str(), Some("bob"));
        assert!(json.get("followersCount").is_none());

        let profile = account_service
            .get_by_id(Context::new(bob.id), alice.id)
            .await
            .unwrap();
        assert_eq!(profile.following_count, 1);
        assert!(!profile.followed_by_me);
    }

    #[tokio::test]
    async fn update_validates_and_keeps_images() {
        let store = fixtures::store();
        let alice = fixtures::account(&store, "alice").await;
        let account_service = AccountService::builder().store(store).build();
        let ctx = Context::new(alice.id);

        let updated = account_service
            .update(
                ctx,
                UpdateAccount::builder()
                    .name("Alice")
                    .bio("hi")
                    .image("https://agora.example/media/a.png".to_string())
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Alice");

        let updated = account_service
            .update(ctx, UpdateAccount::builder().name("Alice").bio("").build())
            .await
            .unwrap();
        assert_eq!(
            updated.image.as_deref(),
            Some("https://agora.example/media/a.png")
        );

        let error = account_service
            .update(
                ctx,
                UpdateAccount::builder().name("Alice").bio("x".repeat(151)).build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error.error_type(), ErrorType::BadRequest(..)));

        let error = account_service
            .update(ctx, UpdateAccount::builder().name("").bio("").build())
            .await
            .unwrap_err();
        assert!(matches!(error.error_type(), ErrorType::BadRequest(..)));

        assert_eq!(account_service.me(ctx).await.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn create_validates_name() {
        let account_service = AccountService::builder()
            .store(fixtures::store())
            .build();

        let account = account_service
            .create(CreateAccount::builder().name("carol").build())
            .await
            .unwrap();
        assert_eq!(account.name, "carol");

        assert!(account_service
            .create(CreateAccount::builder().name("c".repeat(51)).build())
            .await
            .is_err());
    }
}
