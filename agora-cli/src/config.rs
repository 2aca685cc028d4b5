use serde::Deserialize;
use smol_str::SmolStr;

#[derive(Deserialize)]
pub struct Configuration {
    pub database_url: SmolStr,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
}

fn default_max_connections() -> u32 {
    1
}
