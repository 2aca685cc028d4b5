use agora_error::Error;
use agora_service::search::{Search, SearchService, SearchType};
use agora_store::AnyStore;
use color_eyre::eyre;

pub async fn handle(phrase: &str, store: AnyStore) -> eyre::Result<()> {
    let search_service = SearchService::builder().store(store).build();
    let results = search_service
        .search(Search::builder().phrase(phrase).build())
        .await
        .map_err(Error::into_error)?;

    if results.is_empty() {
        eprintln!("Nothing matches \"{phrase}\"");
        return Ok(());
    }

    for result in results {
        let kind = match result.ty {
            SearchType::Account => "account",
            SearchType::Community => "community",
        };

        println!(
            "{kind:<10} {} {:>6} {}",
            result.id, result.followers_count, result.title
        );
    }

    Ok(())
}
