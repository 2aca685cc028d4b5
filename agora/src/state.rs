use agora_config::Configuration;
use agora_service::{
    account::AccountService, community::CommunityService, search::SearchService,
    upload::UploadService, url::UrlService,
};
use agora_storage::fs::Storage;
use agora_store::AnyStore;
use axum::extract::FromRef;

macro_rules! impl_from_ref {
    ($source:path; [ $($target:path => $extract_impl:expr),+ ]) => {
        $(
            impl ::axum::extract::FromRef<$source> for $target {
                fn from_ref(input: &$source) -> Self {
                    #[allow(clippy::redundant_closure_call)]
                    ($extract_impl)(input)
                }
            }
        )+
    };
}

impl_from_ref! {
    Zustand;
    [
        AccountService => |input: &Zustand| input.service.account.clone(),
        CommunityService => |input: &Zustand| input.service.community.clone(),
        SearchService => |input: &Zustand| input.service.search.clone(),
        UploadService => |input: &Zustand| input.service.upload.clone()
    ]
}

/// Service collection
#[derive(Clone)]
pub struct Service {
    pub account: AccountService,
    pub community: CommunityService,
    pub search: SearchService,
    pub upload: UploadService,
}

/// Application state
///
/// Called it "Zustand" to avoid a name collision with `axum::extract::State`.
#[derive(Clone, FromRef)]
pub struct Zustand {
    pub service: Service,
    pub store: AnyStore,
}

impl Zustand {
    /// Wire up the services on top of the store and the media storage
    #[must_use]
    pub fn prepare(config: &Configuration, store: AnyStore, storage: Storage) -> Self {
        let url_service = UrlService::builder()
            .scheme(config.url.scheme.clone())
            .domain(config.url.domain.clone())
            .build();

        let service = Service {
            account: AccountService::builder().store(store.clone()).build(),
            community: CommunityService::builder().store(store.clone()).build(),
            search: SearchService::builder()
                .store(store.clone())
                .max_results(config.search.max_results)
                .build(),
            upload: UploadService::builder()
                .max_upload_size(config.server.max_upload_size)
                .storage_backend(storage)
                .url_service(url_service)
                .build(),
        };

        Self { service, store }
    }
}
