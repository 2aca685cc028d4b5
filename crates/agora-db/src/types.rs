use crate::error::EnumConversionError;
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    serialize::{self, Output, ToSql},
    sql_types::Integer,
};
use serde::{Deserialize, Serialize};

#[derive(
    AsExpression,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    FromSqlRow,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[diesel(sql_type = Integer)]
#[repr(i32)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Role of an account inside of a community
pub enum Role {
    /// Plain member
    #[default]
    Regular = 0,
    /// Member that is allowed to modify the community
    Admin = 1,
}

impl TryFrom<i32> for Role {
    type Error = EnumConversionError<i32>;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Regular),
            1 => Ok(Self::Admin),
            other => Err(EnumConversionError(other)),
        }
    }
}

impl FromSql<Integer, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <i32 as FromSql<Integer, Pg>>::from_sql(bytes)?;
        Ok(Self::try_from(value)?)
    }
}

impl ToSql<Integer, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let value = *self as i32;
        <i32 as ToSql<Integer, Pg>>::to_sql(&value, &mut out.reborrow())
    }
}
