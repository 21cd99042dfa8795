use serde::{Deserialize, Serialize};

/// Business card shown before the map, from `GET /api/card-info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CardInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CardInfo {
    /// Non-empty fields in display order, labelled.
    pub fn lines(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", &self.name),
            ("title", &self.title),
            ("company", &self.company),
            ("website", &self.website),
            ("email", &self.email),
            ("description", &self.description),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}
