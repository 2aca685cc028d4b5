use crate::schema::accounts;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(
    Clone, Debug, Deserialize, Eq, Identifiable, PartialEq, Queryable, Selectable, Serialize,
)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
}

/// Changes to an account
///
/// Fields set to `None` are left untouched
#[derive(AsChangeset, Clone, Debug)]
#[diesel(table_name = accounts)]
pub struct AccountChangeset {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl AccountChangeset {
    /// Apply the changeset to an in-memory model
    pub fn apply(self, account: &mut Account) {
        if let Some(name) = self.name {
            account.name = name;
        }
        if let Some(bio) = self.bio {
            account.bio = Some(bio);
        }
        if let Some(image) = self.image {
            account.image = Some(image);
        }
        if let Some(banner_image) = self.banner_image {
            account.banner_image = Some(banner_image);
        }
        account.updated_at = self.updated_at;
    }
}
