use std::time::Duration;

use log::{debug, error};
use qa_task_poller::TaskStatus;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::client::MlApi;
use super::error::ApiError;
use super::requests::{
    ClusterSettings, ModelGroupRequest, ModelGroupResponse, ModelRegistration,
    ModelSearchRequest, ModelSearchResponse, TaskResponse,
};

const CLUSTER_SETTINGS_PATH: &str = "/_cluster/settings";
const MODEL_GROUP_REGISTER_PATH: &str = "/_plugins/_ml/model_groups/_register";
const MODEL_REGISTER_PATH: &str = "/_plugins/_ml/models/_register";
const MODEL_SEARCH_PATH: &str = "/_plugins/_ml/models/_search";

/// Blocking client for the ML Commons REST API of one cluster.
pub struct MlCommonsClient {
    http: Client,
    base_url: String,
}

impl MlCommonsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send request, reject non-success statuses and decode the JSON body
    fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        debug!("Sending request to {}", path);

        let response = request.send().map_err(|e| {
            error!("API request error for {}: {}", path, e);
            ApiError::Request {
                path: path.to_string(),
                source: e,
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("API error response ({}) from {}: {}", status, path, body);
            return Err(ApiError::Status {
                path: path.to_string(),
                status,
                body,
            });
        }

        response.json().map_err(|e| {
            error!("Failed to parse response from {}: {}", path, e);
            ApiError::Decode {
                path: path.to_string(),
                source: e,
            }
        })
    }
}

impl MlApi for MlCommonsClient {
    fn update_cluster_settings(
        &self,
        settings: &ClusterSettings,
    ) -> Result<serde_json::Value, ApiError> {
        let request = self.http.put(self.url(CLUSTER_SETTINGS_PATH)).json(settings);
        self.send(request, CLUSTER_SETTINGS_PATH)
    }

    fn register_model_group(
        &self,
        request: &ModelGroupRequest,
    ) -> Result<ModelGroupResponse, ApiError> {
        let builder = self
            .http
            .post(self.url(MODEL_GROUP_REGISTER_PATH))
            .json(request);
        self.send(builder, MODEL_GROUP_REGISTER_PATH)
    }

    fn register_model(&self, registration: &ModelRegistration) -> Result<TaskResponse, ApiError> {
        let request = self.http.post(self.url(MODEL_REGISTER_PATH)).json(registration);
        self.send(request, MODEL_REGISTER_PATH)
    }

    fn search_models(&self, size: usize) -> Result<ModelSearchResponse, ApiError> {
        let request = self
            .http
            .post(self.url(MODEL_SEARCH_PATH))
            .json(&ModelSearchRequest::match_all(size));
        self.send(request, MODEL_SEARCH_PATH)
    }

    fn get_task(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        let path = format!("/_plugins/_ml/tasks/{}", task_id);
        let request = self.http.get(self.url(&path));
        self.send(request, &path)
    }

    fn deploy_model(&self, model_id: &str) -> Result<TaskResponse, ApiError> {
        let path = format!("/_plugins/_ml/models/{}/_deploy", model_id);
        let request = self
            .http
            .post(self.url(&path))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        self.send(request, &path)
    }
}
