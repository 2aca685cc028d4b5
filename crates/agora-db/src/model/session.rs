use crate::schema::sessions;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Identifiable, Queryable, Selectable)]
#[diesel(primary_key(token))]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub token: String,
    pub account_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub token: String,
    pub account_id: Uuid,
    pub expires_at: OffsetDateTime,
}
