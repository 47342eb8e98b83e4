pub mod clients;
pub mod config;
pub mod error;
pub mod logging;
pub mod setup;

use std::path::Path;

use log::info;

pub use error::Error;

/// Load settings, connect to the cluster and run the whole setup.
///
/// Returns the id of the deployed model.
pub fn run(config_path: Option<&Path>, base_url: Option<String>) -> Result<String, Error> {
    info!("QA Setup v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::SetupConfig::load_or_default(config_path)?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url)?;
    }
    let client = clients::MlCommonsClient::new(&config.base_url, config.request_timeout())?;
    info!("Cluster: {}", client.base_url());
    let model_id = setup::QaModelSetup::new(&client, &config).run()?;
    Ok(model_id)
}
