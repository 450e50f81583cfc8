use pseo_core::{Error, Result};
use url::Url;

pub mod images;
pub mod models;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Connection settings shared by the text model and the image source.
#[derive(Clone, Default)]
pub struct Config {
    /// `openai` or `dummy`
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
    pub image_model: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("image_model", &self.image_model)
            .finish()
    }
}

impl Config {
    pub fn provider(&self) -> &str {
        self.provider.as_deref().unwrap_or("openai")
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let parsed = Url::parse(raw)
            .map_err(|e| Error::Config(format!("Invalid model URL {}: {}", raw, e)))?;
        Ok(parsed.as_str().trim_end_matches('/').to_string())
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("An API key is required for the openai provider".to_string()))
    }
}

pub mod prelude {
    pub use super::images::create_image_source;
    pub use super::models::create_model;
    pub use super::Config;
    pub use pseo_core::{CompletionRequest, ContentModel, Error, ImageOutput, ImageSource, Result};
}

pub use images::create_image_source;
pub use models::create_model;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let config = Config {
            base_url: Some("http://localhost:8080/v1/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_url().unwrap(), "http://localhost:8080/v1");

        let config = Config {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_api_key_is_redacted_and_required() {
        let config = Config {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("sk-secret"));
        assert_eq!(config.require_api_key().unwrap(), "sk-secret");
        assert!(Config::default().require_api_key().is_err());
    }
}
