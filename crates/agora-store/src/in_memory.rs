use crate::{Counted, FollowCounts, FollowState, MembershipState, StoreBackend};
use agora_db::{
    model::{
        account::{Account, AccountChangeset, NewAccount},
        community::{Community, CommunityChangeset, NewCommunity},
        membership::Membership,
        session::{NewSession, Session},
    },
    types::Role,
};
use agora_error::{bail, ErrorType, OptionExt, Result};
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use triomphe::Arc;
use uuid::Uuid;

#[derive(Default)]
struct State {
    accounts: BTreeMap<Uuid, Account>,
    /// `(account_id, follower_id)`
    follows: BTreeSet<(Uuid, Uuid)>,
    communities: BTreeMap<Uuid, Community>,
    /// Keyed by `(account_id, community_id)`
    memberships: BTreeMap<(Uuid, Uuid), Membership>,
    sessions: AHashMap<String, Session>,
}

impl State {
    fn follower_count(&self, account_id: Uuid) -> u64 {
        self.follows
            .iter()
            .filter(|(followed, _)| *followed == account_id)
            .count() as u64
    }

    fn member_count(&self, community_id: Uuid) -> u64 {
        self.memberships
            .keys()
            .filter(|(_, community)| *community == community_id)
            .count() as u64
    }

    fn counted_account(&self, account: &Account) -> Counted<Account> {
        Counted {
            item: account.clone(),
            count: self.follower_count(account.id),
        }
    }

    fn counted_community(&self, community: &Community) -> Counted<Community> {
        Counted {
            item: community.clone(),
            count: self.member_count(community.id),
        }
    }

    fn counted_accounts<I>(&self, ids: I) -> Vec<Counted<Account>>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let mut accounts: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.accounts.get(&id))
            .map(|account| self.counted_account(account))
            .collect();
        accounts.sort_by_key(|counted| counted.item.id);
        accounts
    }

    fn ensure_account(&self, id: Uuid) -> Result<()> {
        self.accounts.get(&id).map(|_| ()).or_not_found("account")
    }

    fn ensure_community(&self, id: Uuid) -> Result<()> {
        self.communities.get(&id).map(|_| ()).or_not_found("community")
    }
}

/// Store keeping all of its state inside of the process
///
/// Clones share the same state
#[derive(Clone, Default)]
pub struct InMemory {
    state: Arc<RwLock<State>>,
}

impl InMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemory {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            bail!(type = ErrorType::Conflict, "account already exists");
        }
        if let Some(ref email) = account.email {
            if state
                .accounts
                .values()
                .any(|existing| existing.email.as_ref() == Some(email))
            {
                bail!(type = ErrorType::Conflict, "email already in use");
            }
        }

        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: account.id,
            name: account.name,
            email: account.email,
            bio: account.bio,
            image: account.image,
            banner_image: account.banner_image,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn update_account(&self, id: Uuid, changeset: AccountChangeset) -> Result<Account> {
        let mut state = self.state.write().await;
        let account = state.accounts.get_mut(&id).or_not_found("account")?;
        changeset.apply(account);

        Ok(account.clone())
    }

    async fn search_accounts(&self, phrase: &str, limit: usize) -> Result<Vec<Counted<Account>>> {
        let phrase = phrase.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .filter(|account| account.name.to_lowercase().contains(&phrase))
            .take(limit)
            .map(|account| state.counted_account(account))
            .collect())
    }

    async fn follow_counts(&self, account_id: Uuid) -> Result<FollowCounts> {
        let state = self.state.read().await;
        let following = state
            .follows
            .iter()
            .filter(|(_, follower)| *follower == account_id)
            .count() as u64;

        Ok(FollowCounts {
            followers: state.follower_count(account_id),
            following,
        })
    }

    async fn is_following(&self, follower_id: Uuid, account_id: Uuid) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .contains(&(account_id, follower_id)))
    }

    async fn followers(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .filter(|(followed, _)| *followed == account_id)
            .map(|(_, follower)| *follower)
            .collect();

        Ok(state.counted_accounts(ids))
    }

    async fn following(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .filter(|(_, follower)| *follower == account_id)
            .map(|(followed, _)| *followed)
            .collect();

        Ok(state.counted_accounts(ids))
    }

    async fn toggle_follow(&self, follower_id: Uuid, account_id: Uuid) -> Result<FollowState> {
        if follower_id == account_id {
            bail!(
                type = ErrorType::BadRequest(Some("cannot follow yourself".into())),
                "cannot follow yourself"
            );
        }

        let mut state = self.state.write().await;
        state.ensure_account(account_id)?;
        state.ensure_account(follower_id)?;

        if state.follows.remove(&(account_id, follower_id)) {
            Ok(FollowState::NotFollowing)
        } else {
            state.follows.insert((account_id, follower_id));
            Ok(FollowState::Following)
        }
    }

    async fn insert_community(
        &self,
        community: NewCommunity,
        admin_id: Uuid,
    ) -> Result<Community> {
        let mut state = self.state.write().await;
        state.ensure_account(admin_id)?;
        if state.communities.contains_key(&community.id) {
            bail!(type = ErrorType::Conflict, "community already exists");
        }

        let now = OffsetDateTime::now_utc();
        let community = Community {
            id: community.id,
            name: community.name,
            description: community.description,
            image: None,
            banner_image: None,
            created_at: now,
            updated_at: now,
        };
        state.communities.insert(community.id, community.clone());
        state.memberships.insert(
            (admin_id, community.id),
            Membership {
                account_id: admin_id,
                community_id: community.id,
                role: Role::Admin,
                created_at: now,
            },
        );

        Ok(community)
    }

    async fn community_by_id(&self, id: Uuid) -> Result<Option<Counted<Community>>> {
        let state = self.state.read().await;
        Ok(state
            .communities
            .get(&id)
            .map(|community| state.counted_community(community)))
    }

    async fn communities(&self) -> Result<Vec<Counted<Community>>> {
        let state = self.state.read().await;
        Ok(state
            .communities
            .values()
            .map(|community| state.counted_community(community))
            .collect())
    }

    async fn search_communities(
        &self,
        phrase: &str,
        limit: usize,
    ) -> Result<Vec<Counted<Community>>> {
        let phrase = phrase.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .communities
            .values()
            .filter(|community| community.name.to_lowercase().contains(&phrase))
            .take(limit)
            .map(|community| state.counted_community(community))
            .collect())
    }

    async fn popular_communities(&self, limit: usize) -> Result<Vec<Counted<Community>>> {
        let state = self.state.read().await;
        let mut communities: Vec<_> = state
            .communities
            .values()
            .map(|community| state.counted_community(community))
            .filter(|counted| counted.count > 0)
            .collect();

        // Stable sort, ties stay in ID order
        communities.sort_by(|lhs, rhs| rhs.count.cmp(&lhs.count));
        communities.truncate(limit);

        Ok(communities)
    }

    async fn update_community(
        &self,
        id: Uuid,
        changeset: CommunityChangeset,
    ) -> Result<Community> {
        let mut state = self.state.write().await;
        let community = state.communities.get_mut(&id).or_not_found("community")?;
        changeset.apply(community);

        Ok(community.clone())
    }

    async fn membership(
        &self,
        account_id: Uuid,
        community_id: Uuid,
    ) -> Result<Option<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .get(&(account_id, community_id))
            .cloned())
    }

    async fn memberships_of(&self, account_id: Uuid) -> Result<Vec<Membership>> {
        let state = self.state.read().await;
        let mut memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|membership| membership.account_id == account_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|membership| membership.community_id);

        Ok(memberships)
    }

    async fn members(&self, community_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .memberships
            .keys()
            .filter(|(_, community)| *community == community_id)
            .map(|(account, _)| *account)
            .collect();

        Ok(state.counted_accounts(ids))
    }

    async fn toggle_membership(
        &self,
        account_id: Uuid,
        community_id: Uuid,
    ) -> Result<MembershipState> {
        let mut state = self.state.write().await;
        state.ensure_account(account_id)?;
        state.ensure_community(community_id)?;

        let key = (account_id, community_id);
        if state.memberships.remove(&key).is_some() {
            return Ok(MembershipState::NotMember);
        }

        state.memberships.insert(
            key,
            Membership {
                account_id,
                community_id,
                role: Role::Regular,
                created_at: OffsetDateTime::now_utc(),
            },
        );

        Ok(MembershipState::Member)
    }

    async fn insert_session(&self, session: NewSession) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_account(session.account_id)?;
        if state.sessions.contains_key(&session.token) {
            bail!(type = ErrorType::Conflict, "session token already in use");
        }

        state.sessions.insert(
            session.token.clone(),
            Session {
                token: session.token,
                account_id: session.account_id,
                expires_at: session.expires_at,
                created_at: OffsetDateTime::now_utc(),
            },
        );

        Ok(())
    }

    async fn account_by_session(&self, token: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        let account = state
            .sessions
            .get(token)
            .filter(|session| !session.is_expired())
            .and_then(|session| state.accounts.get(&session.account_id))
            .cloned();

        Ok(account)
    }
}

#[cfg(test)]
mod test {
    use super::InMemory;
    use crate::{FollowState, MembershipState, StoreBackend};
    use agora_db::model::{
        account::{AccountChangeset, NewAccount},
        community::NewCommunity,
        session::NewSession,
    };
    use agora_error::ErrorType;
    use pretty_assertions::assert_eq;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    async fn account(store: &InMemory, name: &str) -> Uuid {
        store
            .insert_account(NewAccount {
                id: Uuid::now_v7(),
                name: name.into(),
                email: None,
                bio: None,
                image: None,
                banner_image: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn community(store: &InMemory, name: &str, admin: Uuid) -> Uuid {
        store
            .insert_community(
                NewCommunity {
                    id: Uuid::now_v7(),
                    name: name.into(),
                    description: None,
                },
                admin,
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn emails_are_unique() {
        let store = InMemory::new();
        let new_account = |email: Option<&str>| NewAccount {
            id: Uuid::now_v7(),
            name: "alice".into(),
            email: email.map(Into::into),
            bio: None,
            image: None,
            banner_image: None,
        };

        store
            .insert_account(new_account(Some("alice@example.com")))
            .await
            .unwrap();
        let error = store
            .insert_account(new_account(Some("alice@example.com")))
            .await
            .unwrap_err();
        assert_eq!(*error.error_type(), ErrorType::Conflict);

        store.insert_account(new_account(None)).await.unwrap();
        store.insert_account(new_account(None)).await.unwrap();
    }

    #[tokio::test]
    async fn toggle_follow_twice_restores_state() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;
        let bob = account(&store, "bob").await;

        assert_eq!(
            store.toggle_follow(alice, bob).await.unwrap(),
            FollowState::Following
        );
        assert!(store.is_following(alice, bob).await.unwrap());
        assert!(!store.is_following(bob, alice).await.unwrap());
        assert_eq!(store.follow_counts(bob).await.unwrap().followers, 1);
        assert_eq!(store.follow_counts(alice).await.unwrap().following, 1);

        assert_eq!(
            store.toggle_follow(alice, bob).await.unwrap(),
            FollowState::NotFollowing
        );
        assert!(!store.is_following(alice, bob).await.unwrap());
        assert_eq!(store.follow_counts(bob).await.unwrap().followers, 0);
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;

        let error = store.toggle_follow(alice, alice).await.unwrap_err();
        assert!(matches!(error.error_type(), ErrorType::BadRequest(..)));
        assert!(!store.is_following(alice, alice).await.unwrap());
    }

    #[tokio::test]
    async fn follow_unknown_account() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;

        let error = store.toggle_follow(alice, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(*error.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn follower_lists_carry_counts() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;
        let bob = account(&store, "bob").await;
        let carol = account(&store, "carol").await;

        store.toggle_follow(alice, bob).await.unwrap();
        store.toggle_follow(carol, bob).await.unwrap();
        store.toggle_follow(bob, alice).await.unwrap();

        let followers = store.followers(bob).await.unwrap();
        let ids: Vec<_> = followers.iter().map(|counted| counted.item.id).collect();
        assert_eq!(ids, vec![alice, carol]);
        assert_eq!(followers[0].count, 1);
        assert_eq!(followers[1].count, 0);

        let following = store.following(bob).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].item.id, alice);
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let store = InMemory::new();
        account(&store, "Ally").await;
        account(&store, "ALLY").await;
        account(&store, "Bob").await;
        account(&store, "Sally").await;

        let names: Vec<_> = store
            .search_accounts("lL", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|counted| counted.item.name)
            .collect();
        assert_eq!(names, vec!["Ally", "ALLY", "Sally"]);

        assert_eq!(store.search_accounts("ll", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn community_creator_is_admin() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;
        let bob = account(&store, "bob").await;
        let rust = community(&store, "rust", alice).await;

        let membership = store.membership(alice, rust).await.unwrap().unwrap();
        assert!(membership.is_admin());

        assert_eq!(
            store.toggle_membership(bob, rust).await.unwrap(),
            MembershipState::Member
        );
        let membership = store.membership(bob, rust).await.unwrap().unwrap();
        assert!(!membership.is_admin());
        assert_eq!(store.community_by_id(rust).await.unwrap().unwrap().count, 2);

        assert_eq!(
            store.toggle_membership(bob, rust).await.unwrap(),
            MembershipState::NotMember
        );
        assert_eq!(store.members(rust).await.unwrap().len(), 1);
        assert_eq!(store.memberships_of(alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn popular_orders_by_member_count() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;
        let bob = account(&store, "bob").await;
        let carol = account(&store, "carol").await;

        let small = community(&store, "small", alice).await;
        let large = community(&store, "large", alice).await;
        let medium = community(&store, "medium", bob).await;

        store.toggle_membership(bob, large).await.unwrap();
        store.toggle_membership(carol, large).await.unwrap();
        store.toggle_membership(carol, medium).await.unwrap();

        let popular = store.popular_communities(2).await.unwrap();
        let ids: Vec<_> = popular.iter().map(|counted| counted.item.id).collect();
        assert_eq!(ids, vec![large, medium]);
        assert_eq!(popular[0].count, 3);

        let all = store.popular_communities(5).await.unwrap();
        assert_eq!(all.last().unwrap().item.id, small);
    }

    #[tokio::test]
    async fn update_missing_account() {
        let store = InMemory::new();
        let error = store
            .update_account(
                Uuid::now_v7(),
                AccountChangeset {
                    name: Some("ghost".into()),
                    bio: None,
                    image: None,
                    banner_image: None,
                    updated_at: OffsetDateTime::now_utc(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(*error.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn expired_sessions_dont_resolve() {
        let store = InMemory::new();
        let alice = account(&store, "alice").await;

        store
            .insert_session(NewSession {
                token: "fresh".into(),
                account_id: alice,
                expires_at: OffsetDateTime::now_utc() + Duration::days(1),
            })
            .await
            .unwrap();
        store
            .insert_session(NewSession {
                token: "stale".into(),
                account_id: alice,
                expires_at: OffsetDateTime::now_utc() - Duration::minutes(1),
            })
            .await
            .unwrap();

        assert_eq!(
            store.account_by_session("fresh").await.unwrap().unwrap().id,
            alice
        );
        assert!(store.account_by_session("stale").await.unwrap().is_none());
        assert!(store.account_by_session("missing").await.unwrap().is_none());
    }
}
