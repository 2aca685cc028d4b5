#![forbid(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

use agora_db::model::{
    account::{Account, AccountChangeset, NewAccount},
    community::{Community, CommunityChangeset, NewCommunity},
    membership::Membership,
    session::NewSession,
};
use agora_error::Result;
use ahash::AHashMap;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::in_memory::InMemory as InMemoryStore;
pub use self::postgres::Postgres as PgStore;

mod in_memory;
mod postgres;

/// Record with the number of related records attached to it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counted<T> {
    pub item: T,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FollowState {
    Following,
    NotFollowing,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MembershipState {
    Member,
    NotMember,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

/// Merge the results of a keyed count lookup into the primary records
///
/// Records without an entry in the lookup count as zero
fn attach_counts<T, F>(items: Vec<T>, counts: &AHashMap<Uuid, u64>, id: F) -> Vec<Counted<T>>
where
    F: Fn(&T) -> Uuid,
{
    items
        .into_iter()
        .map(|item| {
            let count = counts.get(&id(&item)).copied().unwrap_or_default();
            Counted { item, count }
        })
        .collect()
}

#[derive(Clone)]
#[enum_dispatch(StoreBackend)]
pub enum AnyStore {
    InMemory(InMemoryStore),
    Postgres(PgStore),
}

#[enum_dispatch]
#[allow(async_fn_in_trait)] // Because of `enum_dispatch`
pub trait StoreBackend: Send + Sync {
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Apply a changeset to an account
    ///
    /// Fails with a not-found error if the account doesn't exist
    async fn update_account(&self, id: Uuid, changeset: AccountChangeset) -> Result<Account>;

    /// Accounts whose name contains the phrase, each with its number of followers
    async fn search_accounts(&self, phrase: &str, limit: usize) -> Result<Vec<Counted<Account>>>;

    async fn follow_counts(&self, account_id: Uuid) -> Result<FollowCounts>;

    async fn is_following(&self, follower_id: Uuid, account_id: Uuid) -> Result<bool>;

    /// Accounts following the account, each with their own number of followers
    async fn followers(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>>;

    /// Accounts followed by the account, each with their own number of followers
    async fn following(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>>;

    /// Remove the follow edge if it exists, create it otherwise
    ///
    /// Returns the state after the toggle
    async fn toggle_follow(&self, follower_id: Uuid, account_id: Uuid) -> Result<FollowState>;

    /// Create a community with the given account as its administrator
    async fn insert_community(&self, community: NewCommunity, admin_id: Uuid)
        -> Result<Community>;

    async fn community_by_id(&self, id: Uuid) -> Result<Option<Counted<Community>>>;

    async fn communities(&self) -> Result<Vec<Counted<Community>>>;

    /// Communities whose name contains the phrase, each with its number of members
    async fn search_communities(
        &self,
        phrase: &str,
        limit: usize,
    ) -> Result<Vec<Counted<Community>>>;

    /// Communities ordered by their number of members, largest first
    async fn popular_communities(&self, limit: usize) -> Result<Vec<Counted<Community>>>;

    async fn update_community(
        &self,
        id: Uuid,
        changeset: CommunityChangeset,
    ) -> Result<Community>;

    async fn membership(&self, account_id: Uuid, community_id: Uuid)
        -> Result<Option<Membership>>;

    async fn memberships_of(&self, account_id: Uuid) -> Result<Vec<Membership>>;

    /// Members of the community, each with their number of followers
    async fn members(&self, community_id: Uuid) -> Result<Vec<Counted<Account>>>;

    /// Leave the community if the account is a member, join it otherwise
    async fn toggle_membership(
        &self,
        account_id: Uuid,
        community_id: Uuid,
    ) -> Result<MembershipState>;

    async fn insert_session(&self, session: NewSession) -> Result<()>;

    /// Resolve an unexpired session token to its account
    async fn account_by_session(&self, token: &str) -> Result<Option<Account>>;
}

#[cfg(test)]
mod test {
    use super::{attach_counts, Counted};
    use ahash::AHashMap;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn missing_counts_are_zero() {
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        let counts = AHashMap::from_iter([(second, 3)]);

        let counted = attach_counts(vec![first, second], &counts, |id| *id);
        assert_eq!(
            counted,
            vec![
                Counted {
                    item: first,
                    count: 0
                },
                Counted {
                    item: second,
                    count: 3
                },
            ]
        );
    }
}
