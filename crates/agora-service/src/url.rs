use smol_str::SmolStr;
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, TypedBuilder)]
pub struct UrlService {
    #[builder(setter(into))]
    scheme: SmolStr,
    #[builder(setter(into))]
    domain: SmolStr,
}

impl UrlService {
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.domain)
    }

    #[must_use]
    pub fn media_url(&self, file: &str) -> String {
        format!("{}/media/{file}", self.base_url())
    }
}
