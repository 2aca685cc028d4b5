use crate::schema::communities;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(
    Clone, Debug, Deserialize, Eq, Identifiable, PartialEq, Queryable, Selectable, Serialize,
)]
#[diesel(table_name = communities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = communities)]
pub struct NewCommunity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Changes to a community
///
/// Fields set to `None` are left untouched
#[derive(AsChangeset, Clone, Debug)]
#[diesel(table_name = communities)]
pub struct CommunityChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl CommunityChangeset {
    pub fn apply(self, community: &mut Community) {
        if let Some(name) = self.name {
            community.name = name;
        }
        if let Some(description) = self.description {
            community.description = Some(description);
        }
        if let Some(image) = self.image {
            community.image = Some(image);
        }
        if let Some(banner_image) = self.banner_image {
            community.banner_image = Some(banner_image);
        }
        community.updated_at = self.updated_at;
    }
}
