use crate::http::extractor::{AuthExtractor, Json};
use agora_error::Result;
use agora_service::search::{Search, SearchResult, SearchService};
use axum::extract::{Query, State};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    search_phrase: String,
}

pub async fn get(
    State(search_service): State<SearchService>,
    _: AuthExtractor,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>> {
    let search = Search::builder().phrase(query.search_phrase.as_str()).build();
    Ok(Json(search_service.search(search).await?))
}
