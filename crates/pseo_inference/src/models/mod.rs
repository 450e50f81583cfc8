use std::sync::Arc;
use pseo_core::{ContentModel, Error, Result};
use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

pub fn create_model(config: &Config) -> Result<Arc<dyn ContentModel>> {
    match config.provider() {
        "openai" => Ok(Arc::new(OpenAiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!("Unknown model provider: {}", other))),
    }
}
