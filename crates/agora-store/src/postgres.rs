use crate::{
    attach_counts, Counted, FollowCounts, FollowState, MembershipState, StoreBackend,
};
use agora_db::{
    model::{
        account::{Account, AccountChangeset, NewAccount},
        community::{Community, CommunityChangeset, NewCommunity},
        follow::NewFollow,
        membership::{Membership, NewMembership},
        session::NewSession,
    },
    schema::{accounts, accounts_follows, communities, communities_members, sessions},
    types::Role,
    with_connection, with_transaction, PgPool,
};
use agora_error::{Error, ErrorType, OptionExt, Result};
use ahash::AHashMap;
use diesel::{
    dsl::{count_star, exists},
    result::{DatabaseErrorKind, Error as DieselError},
    ExpressionMethods, JoinOnDsl, OptionalExtension, PgTextExpressionMethods, QueryDsl,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;
use time::OffsetDateTime;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Translate constraint violations into their matching error types
fn map_db_error(error: DieselError) -> Error {
    let ty = match &error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => ErrorType::Conflict,
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            ErrorType::BadRequest(Some(info.message().to_string()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            ErrorType::NotFound
        }
        _ => return error.into(),
    };

    Error::new(ty, error)
}

/// Escape the wildcard characters of an `ILIKE` pattern and wrap it into a substring match
fn contains_pattern(phrase: &str) -> String {
    let mut pattern = String::with_capacity(phrase.len() + 2);
    pattern.push('%');
    for ch in phrase.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn into_count_map(rows: Vec<(Uuid, i64)>) -> AHashMap<Uuid, u64> {
    rows.into_iter()
        .map(|(id, count)| (id, count.unsigned_abs()))
        .collect()
}

#[derive(Clone, TypedBuilder)]
pub struct Postgres {
    db_pool: PgPool,
}

impl Postgres {
    /// Number of followers per account, keyed by account ID
    async fn follower_counts(&self, ids: &[Uuid]) -> Result<AHashMap<Uuid, u64>> {
        if ids.is_empty() {
            return Ok(AHashMap::new());
        }

        let rows = with_connection!(self.db_pool, |db_conn| {
            accounts_follows::table
                .filter(accounts_follows::account_id.eq_any(ids))
                .group_by(accounts_follows::account_id)
                .select((accounts_follows::account_id, count_star()))
                .load::<(Uuid, i64)>(db_conn)
                .await
        })?;

        Ok(into_count_map(rows))
    }

    /// Number of members per community, keyed by community ID
    async fn member_counts(&self, ids: &[Uuid]) -> Result<AHashMap<Uuid, u64>> {
        if ids.is_empty() {
            return Ok(AHashMap::new());
        }

        let rows = with_connection!(self.db_pool, |db_conn| {
            communities_members::table
                .filter(communities_members::community_id.eq_any(ids))
                .group_by(communities_members::community_id)
                .select((communities_members::community_id, count_star()))
                .load::<(Uuid, i64)>(db_conn)
                .await
        })?;

        Ok(into_count_map(rows))
    }

    async fn with_follower_counts(&self, accounts: Vec<Account>) -> Result<Vec<Counted<Account>>> {
        let ids: Vec<Uuid> = accounts.iter().map(|account| account.id).collect();
        let counts = self.follower_counts(&ids).await?;
        Ok(attach_counts(accounts, &counts, |account| account.id))
    }

    async fn with_member_counts(
        &self,
        communities: Vec<Community>,
    ) -> Result<Vec<Counted<Community>>> {
        let ids: Vec<Uuid> = communities.iter().map(|community| community.id).collect();
        let counts = self.member_counts(&ids).await?;
        Ok(attach_counts(communities, &counts, |community| community.id))
    }
}

impl StoreBackend for Postgres {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        with_connection!(self.db_pool, |db_conn| {
            diesel::insert_into(accounts::table)
                .values(account)
                .returning(Account::as_returning())
                .get_result(db_conn)
                .await
        })
        .map_err(map_db_error)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        with_connection!(self.db_pool, |db_conn| {
            accounts::table
                .find(id)
                .select(Account::as_select())
                .get_result(db_conn)
                .await
                .optional()
        })
        .map_err(Error::from)
    }

    async fn update_account(&self, id: Uuid, changeset: AccountChangeset) -> Result<Account> {
        let account = with_connection!(self.db_pool, |db_conn| {
            diesel::update(accounts::table.find(id))
                .set(changeset)
                .returning(Account::as_returning())
                .get_result(db_conn)
                .await
                .optional()
        })
        .map_err(map_db_error)?;

        account.or_not_found("account")
    }

    #[instrument(skip(self))]
    async fn search_accounts(&self, phrase: &str, limit: usize) -> Result<Vec<Counted<Account>>> {
        let pattern = contains_pattern(phrase);
        let accounts = with_connection!(self.db_pool, |db_conn| {
            accounts::table
                .filter(accounts::name.ilike(&pattern))
                .order(accounts::id.asc())
                .limit(sql_limit(limit))
                .select(Account::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_follower_counts(accounts).await
    }

    async fn follow_counts(&self, account_id: Uuid) -> Result<FollowCounts> {
        let (followers, following) = with_connection!(self.db_pool, |db_conn| {
            let followers: i64 = accounts_follows::table
                .filter(accounts_follows::account_id.eq(account_id))
                .count()
                .get_result(db_conn)
                .await?;

            let following: i64 = accounts_follows::table
                .filter(accounts_follows::follower_id.eq(account_id))
                .count()
                .get_result(db_conn)
                .await?;

            Ok::<_, DieselError>((followers, following))
        })?;

        Ok(FollowCounts {
            followers: followers.unsigned_abs(),
            following: following.unsigned_abs(),
        })
    }

    async fn is_following(&self, follower_id: Uuid, account_id: Uuid) -> Result<bool> {
        with_connection!(self.db_pool, |db_conn| {
            diesel::select(exists(
                accounts_follows::table.find((account_id, follower_id)),
            ))
            .get_result(db_conn)
            .await
        })
        .map_err(Error::from)
    }

    async fn followers(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let accounts = with_connection!(self.db_pool, |db_conn| {
            accounts::table
                .inner_join(
                    accounts_follows::table.on(accounts_follows::follower_id.eq(accounts::id)),
                )
                .filter(accounts_follows::account_id.eq(account_id))
                .order(accounts::id.asc())
                .select(Account::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_follower_counts(accounts).await
    }

    async fn following(&self, account_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let accounts = with_connection!(self.db_pool, |db_conn| {
            accounts::table
                .inner_join(
                    accounts_follows::table.on(accounts_follows::account_id.eq(accounts::id)),
                )
                .filter(accounts_follows::follower_id.eq(account_id))
                .order(accounts::id.asc())
                .select(Account::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_follower_counts(accounts).await
    }

    #[instrument(skip(self))]
    async fn toggle_follow(&self, follower_id: Uuid, account_id: Uuid) -> Result<FollowState> {
        with_transaction!(self.db_pool, |tx| {
            let removed = diesel::delete(accounts_follows::table.find((account_id, follower_id)))
                .execute(tx)
                .await
                .map_err(map_db_error)?;

            if removed > 0 {
                return Ok(FollowState::NotFollowing);
            }

            diesel::insert_into(accounts_follows::table)
                .values(NewFollow {
                    account_id,
                    follower_id,
                })
                .execute(tx)
                .await
                .map_err(map_db_error)?;

            Ok::<_, Error>(FollowState::Following)
        })
    }

    async fn insert_community(
        &self,
        community: NewCommunity,
        admin_id: Uuid,
    ) -> Result<Community> {
        with_transaction!(self.db_pool, |tx| {
            let community = diesel::insert_into(communities::table)
                .values(community)
                .returning(Community::as_returning())
                .get_result(tx)
                .await
                .map_err(map_db_error)?;

            diesel::insert_into(communities_members::table)
                .values(NewMembership {
                    account_id: admin_id,
                    community_id: community.id,
                    role: Role::Admin,
                })
                .execute(tx)
                .await
                .map_err(map_db_error)?;

            Ok::<_, Error>(community)
        })
    }

    async fn community_by_id(&self, id: Uuid) -> Result<Option<Counted<Community>>> {
        let community = with_connection!(self.db_pool, |db_conn| {
            communities::table
                .find(id)
                .select(Community::as_select())
                .get_result(db_conn)
                .await
                .optional()
        })?;

        let Some(community) = community else {
            return Ok(None);
        };

        Ok(self.with_member_counts(vec![community]).await?.pop())
    }

    async fn communities(&self) -> Result<Vec<Counted<Community>>> {
        let communities = with_connection!(self.db_pool, |db_conn| {
            communities::table
                .order(communities::id.asc())
                .select(Community::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_member_counts(communities).await
    }

    #[instrument(skip(self))]
    async fn search_communities(
        &self,
        phrase: &str,
        limit: usize,
    ) -> Result<Vec<Counted<Community>>> {
        let pattern = contains_pattern(phrase);
        let communities = with_connection!(self.db_pool, |db_conn| {
            communities::table
                .filter(communities::name.ilike(&pattern))
                .order(communities::id.asc())
                .limit(sql_limit(limit))
                .select(Community::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_member_counts(communities).await
    }

    async fn popular_communities(&self, limit: usize) -> Result<Vec<Counted<Community>>> {
        let ranked = with_connection!(self.db_pool, |db_conn| {
            communities_members::table
                .group_by(communities_members::community_id)
                .select((communities_members::community_id, count_star()))
                .order_by((count_star().desc(), communities_members::community_id.asc()))
                .limit(sql_limit(limit))
                .load::<(Uuid, i64)>(db_conn)
                .await
        })?;

        let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
        let communities = with_connection!(self.db_pool, |db_conn| {
            communities::table
                .filter(communities::id.eq_any(&ids))
                .select(Community::as_select())
                .load::<Community>(db_conn)
                .await
        })?;

        let mut communities: AHashMap<Uuid, Community> = communities
            .into_iter()
            .map(|community| (community.id, community))
            .collect();

        Ok(ranked
            .into_iter()
            .filter_map(|(id, count)| {
                communities.remove(&id).map(|item| Counted {
                    item,
                    count: count.unsigned_abs(),
                })
            })
            .collect())
    }

    async fn update_community(
        &self,
        id: Uuid,
        changeset: CommunityChangeset,
    ) -> Result<Community> {
        let community = with_connection!(self.db_pool, |db_conn| {
            diesel::update(communities::table.find(id))
                .set(changeset)
                .returning(Community::as_returning())
                .get_result(db_conn)
                .await
                .optional()
        })
        .map_err(map_db_error)?;

        community.or_not_found("community")
    }

    async fn membership(
        &self,
        account_id: Uuid,
        community_id: Uuid,
    ) -> Result<Option<Membership>> {
        with_connection!(self.db_pool, |db_conn| {
            communities_members::table
                .find((account_id, community_id))
                .select(Membership::as_select())
                .get_result(db_conn)
                .await
                .optional()
        })
        .map_err(Error::from)
    }

    async fn memberships_of(&self, account_id: Uuid) -> Result<Vec<Membership>> {
        with_connection!(self.db_pool, |db_conn| {
            communities_members::table
                .filter(communities_members::account_id.eq(account_id))
                .order(communities_members::community_id.asc())
                .select(Membership::as_select())
                .load(db_conn)
                .await
        })
        .map_err(Error::from)
    }

    async fn members(&self, community_id: Uuid) -> Result<Vec<Counted<Account>>> {
        let accounts = with_connection!(self.db_pool, |db_conn| {
            accounts::table
                .inner_join(communities_members::table)
                .filter(communities_members::community_id.eq(community_id))
                .order(accounts::id.asc())
                .select(Account::as_select())
                .load(db_conn)
                .await
        })?;

        self.with_follower_counts(accounts).await
    }

    #[instrument(skip(self))]
    async fn toggle_membership(
        &self,
        account_id: Uuid,
        community_id: Uuid,
    ) -> Result<MembershipState> {
        with_transaction!(self.db_pool, |tx| {
            let removed =
                diesel::delete(communities_members::table.find((account_id, community_id)))
                    .execute(tx)
                    .await
                    .map_err(map_db_error)?;

            if removed > 0 {
                return Ok(MembershipState::NotMember);
            }

            diesel::insert_into(communities_members::table)
                .values(NewMembership {
                    account_id,
                    community_id,
                    role: Role::Regular,
                })
                .execute(tx)
                .await
                .map_err(map_db_error)?;

            Ok::<_, Error>(MembershipState::Member)
        })
    }

    async fn insert_session(&self, session: NewSession) -> Result<()> {
        with_connection!(self.db_pool, |db_conn| {
            diesel::insert_into(sessions::table)
                .values(session)
                .execute(db_conn)
                .await
        })
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn account_by_session(&self, token: &str) -> Result<Option<Account>> {
        with_connection!(self.db_pool, |db_conn| {
            sessions::table
                .inner_join(accounts::table)
                .filter(sessions::token.eq(token))
                .filter(sessions::expires_at.gt(OffsetDateTime::now_utc()))
                .select(Account::as_select())
                .get_result(db_conn)
                .await
                .optional()
        })
        .map_err(Error::from)
    }
}
