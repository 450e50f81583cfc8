use std::fmt;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pseo_core::{ImageOutput, ImageSource, Result};

/// A 1x1 transparent PNG.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Offline image source returning an inline PNG payload.
#[derive(Default)]
pub struct DummyImageSource;

impl fmt::Debug for DummyImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyImageSource").finish()
    }
}

impl DummyImageSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageSource for DummyImageSource {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, _prompt: &str) -> Result<ImageOutput> {
        Ok(ImageOutput::Inline(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(PIXEL_PNG)
        )))
    }
}
