use pseo_core::{Error, LinkCandidate, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::catalog::{CatalogProduct, LinkCatalog};
use crate::scheduler::ContentSpace;
use crate::throttle::RateLimiter;

/// Upper bound on section images per article.
pub const MAX_SECTION_IMAGES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Directory inline images are written to
    pub output_dir: String,
    /// URL prefix under which `output_dir` is served
    pub public_prefix: String,
    /// Stock image used whenever acquisition fails
    pub fallback: String,
    /// Maximum number of section images per article
    pub section_images: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            output_dir: "public/images/generated".to_string(),
            public_prefix: "/images/generated".to_string(),
            fallback: "/images/stock/laboratory.jpg".to_string(),
            section_images: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub between_calls_ms: u64,
    pub between_items_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            between_calls_ms: 2_000,
            between_items_ms: 5_000,
        }
    }
}

impl ThrottleSettings {
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            Duration::from_millis(self.between_calls_ms),
            Duration::from_millis(self.between_items_ms),
        )
    }
}

/// Everything the generator needs besides its collaborators. Loaded from a
/// TOML file; any section left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub content: ContentSpace,
    pub products: Vec<CatalogProduct>,
    pub navigation: Vec<LinkCandidate>,
    pub model: ModelSettings,
    pub images: ImageSettings,
    pub throttle: ThrottleSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let products = default_products();
        let subjects = products.iter().map(|p| p.name.clone()).collect();

        Self {
            content: ContentSpace {
                subjects,
                topics: to_strings(&[
                    "Benefits",
                    "Dosage Guide",
                    "Side Effects",
                    "Research Overview",
                    "Storage and Reconstitution",
                ]),
                intents: to_strings(&["informational", "beginner guide", "buying guide"]),
                competitors: to_strings(&["TB-500", "GHK-Cu", "Ipamorelin"]),
            },
            products,
            navigation: vec![
                LinkCandidate::new("product catalog", "/products"),
                LinkCandidate::new("about us", "/about"),
            ],
            model: ModelSettings::default(),
            images: ImageSettings::default(),
            throttle: ThrottleSettings::default(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_products() -> Vec<CatalogProduct> {
    vec![
        CatalogProduct::new("BPC-157", "bpc-157", &["BPC 157", "BPC157", "Body Protection Compound"]),
        CatalogProduct::new("TB-500", "tb-500", &["TB500", "TB 500", "Thymosin Beta-4"]),
        CatalogProduct::new("GHK-Cu", "ghk-cu", &["GHK Cu", "copper peptide"]),
        CatalogProduct::new("Ipamorelin", "ipamorelin", &["Ipamorellin"]),
        CatalogProduct::new("CJC-1295", "cjc-1295", &["CJC 1295", "CJC1295"]),
        CatalogProduct::new("Semaglutide", "semaglutide", &["Semaglutid"]),
        CatalogProduct::new("Epitalon", "epitalon", &["Epithalon", "Epithalone"]),
    ]
}

impl GeneratorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.subjects.is_empty() {
            return Err(Error::Config("At least one subject is required".to_string()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(Error::Config(format!(
                "Temperature must be between 0 and 2, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be positive".to_string()));
        }
        if self.images.section_images > MAX_SECTION_IMAGES {
            return Err(Error::Config(format!(
                "section_images must be at most {}, got {}",
                MAX_SECTION_IMAGES, self.images.section_images
            )));
        }
        if let Some(product) = self.products.iter().find(|p| p.slug.trim().is_empty()) {
            return Err(Error::Config(format!("Product {} has no slug", product.name)));
        }
        Ok(())
    }

    pub fn catalog(&self) -> LinkCatalog {
        LinkCatalog::new(self.products.clone(), self.navigation.clone())
    }
}
