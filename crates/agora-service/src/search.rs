use crate::DEFAULT_RESULT_LIMIT;
use agora_db::model::{account::Account, community::Community};
use agora_error::{Error, Result};
use agora_store::{AnyStore, Counted, StoreBackend};
use garde::Validate;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    Account,
    Community,
}

/// Uniform projection of an account or a community
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub ty: SearchType,
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    /// Inbound follows for accounts, members for communities
    pub followers_count: u64,
}

impl From<Counted<Account>> for SearchResult {
    fn from(value: Counted<Account>) -> Self {
        Self {
            ty: SearchType::Account,
            id: value.item.id,
            title: value.item.name,
            image: value.item.image,
            followers_count: value.count,
        }
    }
}

impl From<Counted<Community>> for SearchResult {
    fn from(value: Counted<Community>) -> Self {
        Self {
            ty: SearchType::Community,
            id: value.item.id,
            title: value.item.name,
            image: value.item.image,
            followers_count: value.count,
        }
    }
}

#[derive(TypedBuilder, Validate)]
pub struct Search<'a> {
    #[garde(length(min = 1))]
    phrase: &'a str,
}

/// Order the results by their popularity, least popular first, and cut them off at the limit
///
/// The sort is stable, so records sharing a popularity value keep their input order
fn rank<I>(results: I, limit: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = SearchResult>,
{
    let mut results: Vec<SearchResult> = results.into_iter().collect();
    results.sort_by_key(|result| result.followers_count);
    results.truncate(limit);
    results
}

#[derive(Clone, TypedBuilder)]
pub struct SearchService {
    store: AnyStore,
    #[builder(default = DEFAULT_RESULT_LIMIT)]
    max_results: usize,
}

impl SearchService {
    /// Search accounts and communities by name
    ///
    /// Each kind is capped independently before the merge, the merged list is capped again
    #[instrument(skip_all, fields(phrase = search.phrase))]
    pub async fn search(&self, search: Search<'_>) -> Result<Vec<SearchResult>> {
        search.validate().map_err(Error::validation)?;

        let (accounts, communities) = tokio::try_join!(
            self.store.search_accounts(search.phrase, self.max_results),
            self.store.search_communities(search.phrase, self.max_results),
        )?;
        debug!(
            accounts = accounts.len(),
            communities = communities.len(),
            "merging search results"
        );

        let results = accounts
            .into_iter()
            .map(SearchResult::from)
            .chain(communities.into_iter().map(SearchResult::from));

        Ok(rank(results, self.max_results))
    }
}

#[cfg(test)]
mod test {
    use super::{rank, Search, SearchResult, SearchService, SearchType};
    use agora_error::ErrorType;
    use agora_test::fixtures;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn result(ty: SearchType, title: &str, followers_count: u64) -> SearchResult {
        SearchResult {
            ty,
            id: Uuid::now_v7(),
            title: title.into(),
            image: None,
            followers_count,
        }
    }

    fn titles(results: &[SearchResult]) -> Vec<(&str, u64)> {
        results
            .iter()
            .map(|result| (result.title.as_str(), result.followers_count))
            .collect()
    }

    #[test]
    fn rank_is_ascending_and_stable() {
        let ranked = rank(
            vec![
                result(SearchType::Account, "Al", 10),
                result(SearchType::Account, "Ally", 2),
                result(SearchType::Community, "Algebra", 2),
                result(SearchType::Community, "Alchemy", 0),
            ],
            5,
        );

        assert_eq!(
            titles(&ranked),
            vec![("Alchemy", 0), ("Ally", 2), ("Algebra", 2), ("Al", 10)]
        );
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].followers_count <= pair[1].followers_count));
    }

    #[test]
    fn rank_truncates() {
        let ranked = rank(
            (0..8).map(|idx| result(SearchType::Account, "many", 8 - idx)),
            5,
        );
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].followers_count, 1);
        assert_eq!(ranked[4].followers_count, 5);
    }

    #[test]
    fn serialises_in_api_shape() {
        let result = SearchResult {
            ty: SearchType::Community,
            id: Uuid::nil(),
            title: "Algebra".into(),
            image: None,
            followers_count: 5,
        };

        let json: sonic_rs::Value = sonic_rs::to_value(&result).unwrap();
        let expected: sonic_rs::Value = sonic_rs::from_str(
            r#"{"type":"COMMUNITY","id":"00000000-0000-0000-0000-000000000000","title":"Algebra","image":null,"followersCount":5}"#,
        )
        .unwrap();
        assert_eq!(json, expected);
    }

    #[tokio::test]
    async fn merges_accounts_and_communities() {
        let store = fixtures::store();
        let al = fixtures::account(&store, "Al").await;
        let ally = fixtures::account(&store, "Ally").await;
        fixtures::account(&store, "Bob").await;
        fixtures::followers(&store, al.id, 10).await;
        fixtures::followers(&store, ally.id, 2).await;

        let admin = fixtures::account(&store, "admin").await;
        let algebra = fixtures::community(&store, "Algebra", admin.id).await;
        fixtures::members(&store, algebra.id, 4).await;

        let search_service = SearchService::builder().store(store).build();
        let results = search_service
            .search(Search::builder().phrase("al").build())
            .await
            .unwrap();

        assert_eq!(
            titles(&results),
            vec![("Ally", 2), ("Algebra", 5), ("Al", 10)]
        );
        assert_eq!(results[1].ty, SearchType::Community);
        assert_eq!(results[1].id, algebra.id);
    }

    #[tokio::test]
    async fn account_wins_ties() {
        let store = fixtures::store();
        let admin = fixtures::account(&store, "root").await;
        fixtures::community(&store, "Rustaceans", admin.id).await;
        let rusty = fixtures::account(&store, "Rusty").await;
        fixtures::followers(&store, rusty.id, 1).await;

        let search_service = SearchService::builder().store(store).build();
        let results = search_service
            .search(Search::builder().phrase("Rust").build())
            .await
            .unwrap();

        let kinds: Vec<_> = results.iter().map(|result| result.ty).collect();
        assert_eq!(kinds, vec![SearchType::Account, SearchType::Community]);
    }

    #[tokio::test]
    async fn caps_each_kind_before_the_merge() {
        let store = fixtures::store();
        let mut zetas = Vec::new();
        for idx in 0..7 {
            zetas.push(fixtures::account(&store, &format!("zeta-{idx}")).await);
        }
        for zeta in &zetas[..5] {
            fixtures::followers(&store, zeta.id, 10).await;
        }

        let admin = fixtures::account(&store, "root").await;
        fixtures::community(&store, "zeta club", admin.id).await;
        fixtures::community(&store, "zeta fans", admin.id).await;

        let search_service = SearchService::builder().store(store).build();
        let results = search_service
            .search(Search::builder().phrase("zeta").build())
            .await
            .unwrap();

        // The unfollowed zeta-5 and zeta-6 are cut before merging, otherwise they would rank first
        let summary: Vec<_> = results
            .iter()
            .map(|result| (result.ty, result.title.as_str(), result.followers_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                (SearchType::Community, "zeta club", 1),
                (SearchType::Community, "zeta fans", 1),
                (SearchType::Account, "zeta-0", 10),
                (SearchType::Account, "zeta-1", 10),
                (SearchType::Account, "zeta-2", 10),
            ]
        );
        assert!(results
            .iter()
            .all(|result| result.title != "zeta-5" && result.title != "zeta-6"));
    }

    #[tokio::test]
    async fn empty_phrase_is_rejected() {
        let search_service = SearchService::builder()
            .store(fixtures::store())
            .build();

        let error = search_service
            .search(Search::builder().phrase("").build())
            .await
            .unwrap_err();
        assert!(matches!(error.error_type(), ErrorType::BadRequest(..)));
    }
}
