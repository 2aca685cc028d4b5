use crate::{schema::communities_members, types::Role};
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(
    Clone, Debug, Deserialize, Eq, Identifiable, PartialEq, Queryable, Selectable, Serialize,
)]
#[diesel(primary_key(account_id, community_id))]
#[diesel(table_name = communities_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub account_id: Uuid,
    pub community_id: Uuid,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Membership {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, Copy, Debug, Insertable)]
#[diesel(table_name = communities_members)]
pub struct NewMembership {
    pub account_id: Uuid,
    pub community_id: Uuid,
    pub role: Role,
}
