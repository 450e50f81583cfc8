use std::sync::Arc;
use pseo_core::{Error, ImageSource, Result};
use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyImageSource;
pub use openai::OpenAiImageSource;

pub fn create_image_source(config: &Config) -> Result<Arc<dyn ImageSource>> {
    match config.provider() {
        "openai" => Ok(Arc::new(OpenAiImageSource::new(config)?)),
        "dummy" => Ok(Arc::new(DummyImageSource::new())),
        other => Err(Error::Config(format!("Unknown image provider: {}", other))),
    }
}
