use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Maximum size of a media upload in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    pub port: u16,
    pub request_timeout_secs: u64,
}

fn default_max_upload_size() -> usize {
    2 * 1024 * 1024
}
