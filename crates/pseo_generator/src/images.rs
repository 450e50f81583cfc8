use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use lazy_static::lazy_static;
use pseo_core::{Error, ImageOutput, ImageSource, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use crate::slug::slugify;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^#{2,3}[ \t]+(.+?)[ \t#]*$").unwrap();
}

/// Turns whatever the image source returns into something a page can
/// reference: a pass-through URL or a path under the public image prefix.
pub struct ImageAdapter {
    source: Arc<dyn ImageSource>,
    output_dir: PathBuf,
    public_prefix: String,
    fallback: String,
}

impl std::fmt::Debug for ImageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAdapter")
            .field("source", &self.source.name())
            .field("output_dir", &self.output_dir)
            .field("public_prefix", &self.public_prefix)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ImageAdapter {
    pub fn new(
        source: Arc<dyn ImageSource>,
        output_dir: impl Into<PathBuf>,
        public_prefix: &str,
        fallback: &str,
    ) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
            fallback: fallback.to_string(),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Never fails: any problem yields the fallback stock image.
    pub async fn acquire_image(&self, prompt: &str, slug: &str) -> String {
        match self.try_acquire_image(prompt, slug).await {
            Ok(location) => location,
            Err(e) => {
                warn!("🖼️ Image for {} unavailable, using fallback: {}", slug, e);
                self.fallback.clone()
            }
        }
    }

    pub async fn try_acquire_image(&self, prompt: &str, slug: &str) -> Result<String> {
        match self.source.generate(prompt).await? {
            ImageOutput::Url(url) => match Url::parse(url.trim()) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url.trim().to_string()),
                _ => Err(Error::Image(format!("Not an absolute image URL: {}", url))),
            },
            ImageOutput::Inline(payload) => self.persist(&payload, slug).await,
        }
    }

    async fn persist(&self, payload: &str, slug: &str) -> Result<String> {
        let (extension, data) = split_payload(payload);
        let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        if data.is_empty() {
            return Err(Error::Image("Empty image payload".to_string()));
        }

        let bytes = STANDARD
            .decode(data.as_bytes())
            .map_err(|e| Error::Image(format!("Invalid base64 payload: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::Image("Empty image payload".to_string()));
        }

        let stem = match slugify(slug) {
            s if s.is_empty() => "image".to_string(),
            s => s,
        };
        let file_name = format!("{}-{}.{}", stem, Utc::now().timestamp_millis(), extension);

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(&file_name), &bytes).await?;
        debug!("Stored {} byte image as {}", bytes.len(), file_name);

        Ok(format!("{}/{}", self.public_prefix, file_name))
    }
}

/// Split a `data:image/<type>;base64,<data>` URI into a file extension and
/// the encoded data. Bare payloads are assumed to be PNG.
fn split_payload(payload: &str) -> (&'static str, &str) {
    let payload = payload.trim();
    let Some(rest) = payload.strip_prefix("data:") else {
        return ("png", payload);
    };
    let Some((meta, data)) = rest.split_once(',') else {
        return ("png", rest);
    };

    let extension = match meta.split(';').next().unwrap_or_default() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    };
    (extension, data)
}

/// Markdown `##`/`###` headings in document order, at most `limit`.
pub fn section_headings(content: &str, limit: usize) -> Vec<String> {
    HEADING
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '*' || c == '_').trim().to_string())
        .filter(|heading| !heading.is_empty())
        .take(limit)
        .collect()
}
