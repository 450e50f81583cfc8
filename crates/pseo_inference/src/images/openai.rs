use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use pseo_core::{Error, ImageOutput, ImageSource, Result};
use crate::{Config, DEFAULT_IMAGE_MODEL};

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

/// Image generation client for an OpenAI-compatible `/images/generations` endpoint.
pub struct OpenAiImageSource {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
    size: String,
}

impl OpenAiImageSource {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key: config.require_api_key()?,
            base_url: config.base_url()?,
            model_name: config
                .image_model
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            size: "1792x1024".to_string(),
        })
    }

    pub fn with_size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }
}

impl fmt::Debug for OpenAiImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiImageSource")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("size", &self.size)
            .finish()
    }
}

#[async_trait]
impl ImageSource for OpenAiImageSource {
    fn name(&self) -> &str {
        "OpenAI Images"
    }

    async fn generate(&self, prompt: &str) -> Result<ImageOutput> {
        let request = ImageRequest {
            model: &self.model_name,
            prompt,
            n: 1,
            size: &self.size,
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Image(format!("Image API returned {}", status)));
        }

        let data = response
            .json::<ImageResponse>()
            .await?
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Image("Image API returned no data".to_string()))?;

        match (data.url, data.b64_json) {
            (Some(url), _) if !url.is_empty() => Ok(ImageOutput::Url(url)),
            (_, Some(payload)) if !payload.is_empty() => Ok(ImageOutput::Inline(payload)),
            _ => Err(Error::Image("Image API returned an empty payload".to_string())),
        }
    }
}
