use log::warn;
use qa_task_poller::{TaskSource, TaskStatus};

use super::error::ApiError;
use super::requests::{
    ClusterSettings, ModelGroupRequest, ModelGroupResponse, ModelRegistration,
    ModelSearchResponse, TaskResponse,
};

/// Trait for the ML Commons endpoints the setup flow calls.
///
/// `MlCommonsClient` talks to a real cluster; tests substitute scripted
/// implementations.
pub trait MlApi {
    /// Update persistent cluster settings. Returns the raw acknowledgement.
    fn update_cluster_settings(
        &self,
        settings: &ClusterSettings,
    ) -> Result<serde_json::Value, ApiError>;

    fn register_model_group(
        &self,
        request: &ModelGroupRequest,
    ) -> Result<ModelGroupResponse, ApiError>;

    /// Start asynchronous model registration.
    fn register_model(&self, registration: &ModelRegistration) -> Result<TaskResponse, ApiError>;

    /// List registered models, at most `size` hits.
    fn search_models(&self, size: usize) -> Result<ModelSearchResponse, ApiError>;

    fn get_task(&self, task_id: &str) -> Result<TaskStatus, ApiError>;

    /// Start asynchronous deployment of a registered model.
    fn deploy_model(&self, model_id: &str) -> Result<TaskResponse, ApiError>;
}

/// Exposes an [`MlApi`]'s task endpoint to the poller.
///
/// A non-success status (e.g. a 404 right after registration, before the
/// task is indexed) is reported as a status without state, so it uses up
/// one attempt instead of ending the poll. Transport and decode errors
/// still end it.
pub struct TaskEndpoint<'a, A: ?Sized>(pub &'a A);

impl<A: MlApi + ?Sized> TaskSource for TaskEndpoint<'_, A> {
    type Error = ApiError;

    fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        match self.0.get_task(task_id) {
            Err(e) => match e.status() {
                Some(status) => {
                    warn!("Task {} lookup returned status {}", task_id, status);
                    Ok(TaskStatus::default())
                }
                None => Err(e),
            },
            ok => ok,
        }
    }
}
