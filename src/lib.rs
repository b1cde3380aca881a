pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod http;
pub mod model;
pub mod service;
pub mod training;

use std::sync::Arc;

use crate::config::Config;
use crate::dataset::DatasetSource;
use crate::service::ServiceContext;

/// Load (or train) the model and assemble the shared service context.
/// Failure here is fatal: the server must not start without a model.
pub fn build_service(config: &Config) -> error::Result<ServiceContext> {
    let model = training::load_or_train(config)?;
    let dataset = DatasetSource::new(&config.dataset.path, &config.dataset.label_column);
    Ok(ServiceContext::new(Arc::new(model), dataset).with_model_path(&config.model.artifact_path))
}
