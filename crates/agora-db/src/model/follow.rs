use crate::schema::accounts_follows;
use diesel::Insertable;
use uuid::Uuid;

/// Directed follow edge
///
/// `follower_id` follows `account_id`
#[derive(Clone, Copy, Debug, Insertable)]
#[diesel(table_name = accounts_follows)]
pub struct NewFollow {
    pub account_id: Uuid,
    pub follower_id: Uuid,
}
