//!
//! Quick ways to seed a store with data
//!

use agora_db::model::{
    account::{Account, NewAccount},
    community::{Community, NewCommunity},
    session::NewSession,
};
use agora_store::{AnyStore, InMemoryStore, StoreBackend};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Empty in-memory store
#[must_use]
pub fn store() -> AnyStore {
    InMemoryStore::new().into()
}

pub async fn account(store: &AnyStore, name: &str) -> Account {
    store
        .insert_account(NewAccount {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: None,
            bio: None,
            image: None,
            banner_image: None,
        })
        .await
        .expect("Failed to insert account")
}

/// Create a community administrated by `admin`
pub async fn community(store: &AnyStore, name: &str, admin: Uuid) -> Community {
    store
        .insert_community(
            NewCommunity {
                id: Uuid::now_v7(),
                name: name.to_string(),
                description: None,
            },
            admin,
        )
        .await
        .expect("Failed to insert community")
}

/// Make `count` fresh accounts follow the account
pub async fn followers(store: &AnyStore, account_id: Uuid, count: usize) {
    for idx in 0..count {
        let follower = account(store, &format!("follower-{idx}")).await;
        store
            .toggle_follow(follower.id, account_id)
            .await
            .expect("Failed to follow account");
    }
}

/// Add `count` fresh accounts as members of the community
pub async fn members(store: &AnyStore, community_id: Uuid, count: usize) {
    for idx in 0..count {
        let member = account(store, &format!("member-{idx}")).await;
        store
            .toggle_membership(member.id, community_id)
            .await
            .expect("Failed to join community");
    }
}

/// Issue a session token valid for one day
pub async fn session(store: &AnyStore, account_id: Uuid) -> String {
    let token = Uuid::now_v7().simple().to_string();
    store
        .insert_session(NewSession {
            token: token.clone(),
            account_id,
            expires_at: OffsetDateTime::now_utc() + Duration::days(1),
        })
        .await
        .expect("Failed to insert session");

    token
}
