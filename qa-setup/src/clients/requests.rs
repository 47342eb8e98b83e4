//! Request and response bodies of the ML Commons REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `PUT /_cluster/settings`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterSettings {
    pub persistent: MlNodeSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MlNodeSettings {
    #[serde(rename = "plugins.ml_commons.only_run_on_ml_node")]
    pub only_run_on_ml_node: bool,
    #[serde(rename = "plugins.ml_commons.allow_registering_model_via_url")]
    pub allow_registering_model_via_url: bool,
}

impl ClusterSettings {
    /// Let data nodes run models and allow registration from a URL.
    pub fn ml_on_data_nodes() -> Self {
        Self {
            persistent: MlNodeSettings {
                only_run_on_ml_node: false,
                allow_registering_model_via_url: true,
            },
        }
    }
}

/// Body of `POST /_plugins/_ml/model_groups/_register`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelGroupRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelGroupResponse {
    #[serde(default)]
    pub model_group_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /_plugins/_ml/models/_register`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelRegistration {
    pub name: String,
    pub version: String,
    pub function_name: String,
    pub description: String,
    pub model_format: String,
    /// Omitted when no group could be registered; the cluster then creates one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_group_id: Option<String>,
    pub model_content_hash_value: String,
    pub model_config: ModelConfig,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelConfig {
    pub model_type: String,
    pub framework_type: String,
}

/// Answer to a register or deploy call: an async task handle.
///
/// Unknown fields are kept so the full response can be logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskResponse {
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Body of `POST /_plugins/_ml/models/_search`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelSearchRequest {
    pub query: Value,
    pub size: usize,
}

impl ModelSearchRequest {
    pub fn match_all(size: usize) -> Self {
        Self {
            query: serde_json::json!({ "match_all": {} }),
            size,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelSearchResponse {
    #[serde(default)]
    pub hits: SearchHits,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchHits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Option<ModelSource>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ModelSource {
    #[serde(default)]
    pub task_id: Option<String>,
}

impl ModelSearchResponse {
    /// Id of the first model whose source was created by `task_id`.
    /// Hits with a blank `_id` are skipped.
    pub fn model_id_for_task(&self, task_id: &str) -> Option<&str> {
        self.hits
            .hits
            .iter()
            .filter(|hit| {
                hit.source
                    .as_ref()
                    .and_then(|source| source.task_id.as_deref())
                    == Some(task_id)
            })
            .filter_map(|hit| hit.id.as_deref())
            .find(|id| !id.trim().is_empty())
    }
}
