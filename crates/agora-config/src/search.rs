use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Cap applied to each entity kind before merging and to the merged list
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    5
}
