//! The one-shot setup sequence: cluster settings, model group, model
//! registration, model-id resolution and deployment.

use log::{info, warn};
use qa_task_poller::{wait_for_task, PollError, PollPolicy, TaskStatus};

use crate::clients::requests::{
    ClusterSettings, ModelConfig, ModelGroupRequest, ModelRegistration, TaskResponse,
};
use crate::clients::{ApiError, MlApi, TaskEndpoint};
use crate::config::SetupConfig;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Task(#[from] PollError<ApiError>),
    #[error("Model registration failed with status {status}: {body}")]
    RegistrationRejected { status: u16, body: String },
    #[error("No task_id returned from model registration: {response}")]
    MissingTaskId { response: String },
    #[error("Could not find model ID for task {task_id}")]
    ModelIdNotFound { task_id: String },
}

/// Local-time suffix that keeps group and model names unique.
pub fn timestamp_suffix() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Runs the setup sequence against one cluster.
pub struct QaModelSetup<'a, A: MlApi + ?Sized> {
    api: &'a A,
    config: &'a SetupConfig,
    policy: PollPolicy,
}

impl<'a, A: MlApi + ?Sized> QaModelSetup<'a, A> {
    pub fn new(api: &'a A, config: &'a SetupConfig) -> Self {
        Self {
            api,
            config,
            policy: config.poll.policy(),
        }
    }

    /// Replace the polling budget taken from the config.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run every step, naming resources with the current timestamp.
    ///
    /// Returns the id of the deployed model.
    pub fn run(&self) -> Result<String, SetupError> {
        self.run_with_suffix(&timestamp_suffix())
    }

    pub fn run_with_suffix(&self, suffix: &str) -> Result<String, SetupError> {
        info!("Enabling ML on data nodes...");
        match self
            .api
            .update_cluster_settings(&ClusterSettings::ml_on_data_nodes())
        {
            Ok(settings) => info!("Settings response: {}", settings),
            Err(e) if e.status().is_some() => warn!("Cluster settings not applied: {}", e),
            Err(e) => return Err(e.into()),
        }

        info!("Registering model group...");
        let model_group_id = self.register_model_group(suffix)?;

        info!("Registering QA model...");
        let task_id = self.register_model(suffix, model_group_id)?;
        info!("Task ID: {}", task_id);

        info!("Waiting for registration to complete...");
        let model_id = self.resolve_model_id(&task_id)?;
        info!("Model ID: {}", model_id);

        info!("Deploying model...");
        self.deploy_model(&model_id)?;

        Ok(model_id)
    }

    /// A rejected group registration is not fatal: the model is then
    /// registered without a group.
    fn register_model_group(&self, suffix: &str) -> Result<Option<String>, SetupError> {
        let group = &self.config.model_group;
        let request = ModelGroupRequest {
            name: format!("{}_{}", group.name_prefix, suffix),
            description: group.description.clone(),
        };

        let response = match self.api.register_model_group(&request) {
            Ok(response) => response,
            Err(e) if e.status().is_some() => {
                warn!("Model group not registered, registering without a group: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match &response.model_group_id {
            Some(id) => info!("Model Group ID: {}", id),
            None => warn!(
                "No model_group_id in response (status {:?}), registering without a group",
                response.status
            ),
        }

        Ok(response.model_group_id)
    }

    /// Start registration and return its task id.
    fn register_model(
        &self,
        suffix: &str,
        model_group_id: Option<String>,
    ) -> Result<String, SetupError> {
        let spec = &self.config.model;
        let registration = ModelRegistration {
            name: format!("{}_{}", spec.name_prefix, suffix),
            version: spec.version.clone(),
            function_name: spec.function_name.clone(),
            description: spec.description.clone(),
            model_format: spec.model_format.clone(),
            model_group_id,
            model_content_hash_value: spec.content_hash.clone(),
            model_config: ModelConfig {
                model_type: spec.model_type.clone(),
                framework_type: spec.framework_type.clone(),
            },
            url: spec.url.clone(),
        };

        let response = self
            .api
            .register_model(&registration)
            .map_err(|e| match e {
                ApiError::Status { status, body, .. } => {
                    SetupError::RegistrationRejected { status, body }
                }
                other => SetupError::Api(other),
            })?;
        info!("Register response: {}", response.to_pretty_json());

        response
            .task_id
            .clone()
            .ok_or_else(|| SetupError::MissingTaskId {
                response: response.to_pretty_json(),
            })
    }

    /// Wait for the registration task, then read the model id from its
    /// payload, or search for the model created by that task.
    pub fn resolve_model_id(&self, task_id: &str) -> Result<String, SetupError> {
        let status = self.wait_for(task_id)?;
        if let Some(model_id) = status.model_id.filter(|id| !id.trim().is_empty()) {
            return Ok(model_id);
        }

        info!("Task {} has no model_id, searching models", task_id);
        let models = self.api.search_models(self.config.search_size)?;
        models
            .model_id_for_task(task_id)
            .map(str::to_string)
            .ok_or_else(|| SetupError::ModelIdNotFound {
                task_id: task_id.to_string(),
            })
    }

    /// Deploy and, when the cluster answers with a task, wait for it.
    fn deploy_model(&self, model_id: &str) -> Result<TaskResponse, SetupError> {
        let response = self.api.deploy_model(model_id)?;

        if let Some(deploy_task_id) = &response.task_id {
            info!("Waiting for deployment task {} to complete...", deploy_task_id);
            self.wait_for(deploy_task_id)?;
        }

        info!("Deploy response: {}", response.to_pretty_json());
        Ok(response)
    }

    fn wait_for(&self, task_id: &str) -> Result<TaskStatus, SetupError> {
        wait_for_task(&TaskEndpoint(self.api), task_id, &self.policy).map_err(|e| {
            warn!("Stopped polling task {}: {}", e.task_id(), e);
            SetupError::Task(e)
        })
    }
}
