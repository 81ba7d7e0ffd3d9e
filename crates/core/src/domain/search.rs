use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    pub total_count: u64,
    #[serde(default)]
    pub limit: u64,
}

impl SearchResults {
    pub fn has_more(&self) -> bool {
        self.total_count > self.limit
    }
}
