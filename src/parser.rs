use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct SpecFile {
    pub setup: Setup,
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub actors: BTreeMap<String, ActorEntry>,
    #[serde(default)]
    pub specs: Vec<SpecEntry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Setup {
    pub base_url: String,
    pub name: Option<String>,
    pub strict_sequences: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Global {
    pub headers: Option<toml::Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ActorEntry {
    pub headers: Option<toml::Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SpecEntry {
    pub title: Option<String>,
    pub endpoint: String,
    pub method: String,
    pub expected_status: i64,
    pub actors: Option<Vec<String>>,
    pub expected_response: Option<serde_json::Value>,
    pub request_payload: Option<serde_json::Value>,
}
