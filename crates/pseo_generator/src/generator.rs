//! The batch loop: schedule, generate, enrich, link and persist.

use chrono::Utc;
use pseo_core::{
    ContentModel, Error, ExistingContent, ImageSource, LinkCandidate, PageKind, PageStorage,
    PublishedPage, Result, RunSummary, WorkItem,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use crate::catalog::LinkCatalog;
use crate::config::{GeneratorConfig, ModelSettings, MAX_SECTION_IMAGES};
use crate::images::{section_headings, ImageAdapter};
use crate::logging::Logger;
use crate::scheduler::{build_queue, collides, next_batch, ContentSpace};
use crate::slug::unique_slug;
use crate::throttle::RateLimiter;
use crate::{linker, parser, prompts};

/// Terminal state of one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Generated(String),
    Skipped,
    Errored(String),
}

pub struct Generator {
    model: Arc<dyn ContentModel>,
    images: ImageAdapter,
    storage: Arc<dyn PageStorage>,
    catalog: LinkCatalog,
    space: ContentSpace,
    model_settings: ModelSettings,
    section_images: usize,
    limiter: RateLimiter,
    dry_run: bool,
    stop: Arc<AtomicBool>,
}

impl Generator {
    pub fn new(
        config: &GeneratorConfig,
        model: Arc<dyn ContentModel>,
        image_source: Arc<dyn ImageSource>,
        storage: Arc<dyn PageStorage>,
    ) -> Self {
        Self {
            model,
            images: ImageAdapter::new(
                image_source,
                &config.images.output_dir,
                &config.images.public_prefix,
                &config.images.fallback,
            ),
            storage,
            catalog: config.catalog(),
            space: config.content.clone(),
            model_settings: config.model.clone(),
            section_images: config.images.section_images.min(MAX_SECTION_IMAGES),
            limiter: config.throttle.rate_limiter(),
            dry_run: false,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Run everything except the final write.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Setting the returned flag stops the batch before the next item starts.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Snapshot existing content, claim a batch and process it.
    pub async fn run(&self, batch_size: usize) -> Result<RunSummary> {
        info!("🔎 Loading existing titles and slugs");
        let existing = self.storage.find_existing_titles_and_slugs().await?;

        let queue = build_queue(&self.space);
        let batch = next_batch(&queue, &existing, batch_size);
        info!(
            "🗂️ Backlog has {} slots, {} already published, {} claimed for this run",
            queue.len(),
            existing.len(),
            batch.len()
        );

        Ok(self.run_items(&batch, &existing).await)
    }

    /// Process `items` in order. Items are checked against `existing`, which
    /// is not updated with pages generated earlier in the same batch.
    pub async fn run_items(&self, items: &[WorkItem], existing: &ExistingContent) -> RunSummary {
        let mut summary = RunSummary::default();

        for (i, item) in items.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                info!("🛑 Stop requested, leaving {} item(s) unprocessed", items.len() - i);
                break;
            }
            if i > 0 {
                self.limiter.between_items().await;
            }

            let logger = Logger::new()
                .with_prefix(format!("[{}/{}]", i + 1, items.len()))
                .with_prefix(item.to_string());

            match self.process_item(item, existing, &logger).await {
                ItemOutcome::Generated(_) => summary.generated += 1,
                ItemOutcome::Skipped => summary.skipped += 1,
                ItemOutcome::Errored(_) => summary.errors += 1,
            }
        }

        info!("📊 {}", summary);
        summary
    }

    pub async fn process_item(
        &self,
        item: &WorkItem,
        existing: &ExistingContent,
        logger: &Logger,
    ) -> ItemOutcome {
        if collides(item, existing) {
            logger.info("⏭️ Similar content already published, skipping");
            return ItemOutcome::Skipped;
        }

        let page = match self.build_page(item, logger).await {
            Ok(page) => page,
            Err(e) => {
                logger.error(&format!("❌ Generation failed: {}", e));
                return ItemOutcome::Errored(e.to_string());
            }
        };

        if self.dry_run {
            logger.info(&format!("🧪 Dry run, not saving {}", page.slug));
            return ItemOutcome::Generated(page.slug);
        }

        match self.storage.create(&page).await {
            Ok(()) => {
                logger.info(&format!("✅ Published {} ({})", page.title, page.kind.url_for(&page.slug)));
                ItemOutcome::Generated(page.slug)
            }
            Err(e) => {
                logger.error(&format!("❌ Failed to save {}: {}", page.slug, e));
                ItemOutcome::Errored(e.to_string())
            }
        }
    }

    async fn build_page(&self, item: &WorkItem, logger: &Logger) -> Result<PublishedPage> {
        logger.info(&format!("🤖 Requesting article from {}", self.model.name()));
        let request = prompts::article_request(item, &self.model_settings);
        let response = self.model.complete(&request).await;
        self.limiter.after_call().await;

        let article = parser::parse(&response?).ok_or_else(|| {
            Error::Inference("Response was malformed, truncated or too short".to_string())
        })?;
        logger.info(&format!("📝 Parsed \"{}\" ({} characters)", article.title, article.content.chars().count()));

        let slug = unique_slug(&article.title);

        let cover_image = self
            .images
            .acquire_image(&prompts::cover_image_prompt(&article.title, item), &slug)
            .await;
        self.limiter.after_call().await;

        let mut section_images = Vec::new();
        for (i, heading) in section_headings(&article.content, self.section_images).iter().enumerate() {
            let key = format!("{}-section-{}", slug, i + 1);
            match self
                .images
                .try_acquire_image(&prompts::section_image_prompt(heading, item), &key)
                .await
            {
                Ok(location) => section_images.push(location),
                Err(e) => logger.warn(&format!("🖼️ Section image for \"{}\" omitted: {}", heading, e)),
            }
            self.limiter.after_call().await;
        }

        let candidates = self.link_candidates(item, logger).await;
        let content = linker::inject(&article.content, &candidates);
        logger.debug(&format!("🔗 Tried {} link candidates", candidates.len()));

        Ok(PublishedPage {
            kind: item.kind(),
            slug,
            title: article.title,
            content,
            excerpt: article.excerpt,
            meta_description: article.meta_description,
            keywords: article.keywords,
            cover_image: Some(cover_image),
            section_images,
            created_at: Utc::now(),
        })
    }

    /// Catalog products for the subject, navigation links and every published
    /// page, read fresh so cross-links include pages from earlier items.
    async fn link_candidates(&self, item: &WorkItem, logger: &Logger) -> Vec<LinkCandidate> {
        let mut candidates = self.catalog.candidates_for(&item.subject);
        candidates.extend(self.catalog.navigation().iter().cloned());

        for kind in PageKind::ALL {
            match self.storage.list_published(kind).await {
                Ok(published) => candidates.extend(published),
                Err(e) => logger.warn(&format!("⚠️ Could not list published {} pages: {}", kind, e)),
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProduct;
    use crate::test_utils::RecordingSleeper;
    use async_trait::async_trait;
    use pseo_core::{CompletionRequest, ImageOutput};
    use pseo_inference::images::DummyImageSource;
    use pseo_inference::models::DummyModel;
    use pseo_storage::InMemoryStorage;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::fmt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct ScriptedModel {
        responses: Mutex<VecDeque<std::result::Result<String, String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl fmt::Debug for ScriptedModel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("ScriptedModel")
        }
    }

    impl ScriptedModel {
        fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentModel for ScriptedModel {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
                .map_err(Error::Inference)
        }
    }

    #[derive(Debug)]
    struct FailingImages;

    #[async_trait]
    impl ImageSource for FailingImages {
        fn name(&self) -> &str {
            "Failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<ImageOutput> {
            Err(Error::Image("service unavailable".to_string()))
        }
    }

    /// Storage whose writes always fail.
    struct ReadOnlyStorage;

    #[async_trait]
    impl PageStorage for ReadOnlyStorage {
        async fn find_existing_titles_and_slugs(&self) -> Result<ExistingContent> {
            Ok(ExistingContent::default())
        }

        async fn create(&self, page: &PublishedPage) -> Result<()> {
            Err(Error::Storage(format!("Slug already exists: {}", page.slug)))
        }

        async fn list_published(&self, _kind: PageKind) -> Result<Vec<LinkCandidate>> {
            Err(Error::Database("connection reset".to_string()))
        }
    }

    fn article_json(title: &str, body: &str) -> String {
        let mut content = String::from("## Overview\n\n");
        while content.chars().count() < 900 {
            content.push_str(body);
            content.push_str("\n\n");
        }
        content.push_str("## Summary\n\nThat is all for now.");
        json!({
            "title": title,
            "content": content,
            "excerpt": "Excerpt.",
            "keywords": ["peptides"],
            "metaDescription": "Meta.",
        })
        .to_string()
    }

    fn config(images: &TempDir) -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.content = ContentSpace {
            subjects: vec!["BPC-157".to_string(), "TB-500".to_string()],
            topics: vec!["Benefits".to_string(), "Dosage".to_string()],
            intents: vec!["guide".to_string()],
            competitors: vec![],
        };
        config.products = vec![
            CatalogProduct::new("BPC-157", "bpc-157", &["BPC 157"]),
            CatalogProduct::new("TB-500", "tb-500", &[]),
        ];
        config.images.output_dir = images.path().to_string_lossy().to_string();
        config
    }

    fn generator(
        config: &GeneratorConfig,
        model: Arc<dyn ContentModel>,
        images: Arc<dyn ImageSource>,
        storage: Arc<dyn PageStorage>,
        sleeper: Arc<RecordingSleeper>,
    ) -> Generator {
        Generator::new(config, model, images, storage).with_rate_limiter(RateLimiter::with_sleeper(
            Duration::from_millis(10),
            Duration::from_millis(100),
            sleeper,
        ))
    }

    #[tokio::test]
    async fn test_run_generates_links_and_persists() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let storage = Arc::new(InMemoryStorage::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let generator = generator(
            &config,
            Arc::new(DummyModel::new()),
            Arc::new(DummyImageSource::new()),
            storage.clone(),
            sleeper.clone(),
        );

        let summary = generator.run(3).await.unwrap();
        assert_eq!(summary, RunSummary { generated: 3, skipped: 0, errors: 0 });

        let pages = storage.pages().await;
        assert_eq!(pages.len(), 3);
        for page in &pages {
            assert_eq!(page.kind, PageKind::Article);
            let product_url = if page.title.starts_with("BPC-157") {
                "/products/bpc-157"
            } else {
                "/products/tb-500"
            };
            assert!(page.content.contains(product_url), "missing product link in {}", page.title);
            assert!(page.cover_image.as_deref().unwrap().starts_with("/images/generated/"));
            // the dummy model writes three sections
            assert_eq!(page.section_images.len(), 3);
        }

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 3 * 4);

        // per item: one model call, one cover, three sections; pauses between items
        let slept = sleeper.slept();
        assert_eq!(slept.iter().filter(|d| **d == Duration::from_millis(10)).count(), 3 * 5);
        assert_eq!(slept.iter().filter(|d| **d == Duration::from_millis(100)).count(), 2);

        // a second run only sees what is left of the backlog
        let summary = generator.run(10).await.unwrap();
        assert_eq!(summary.generated, 1);
        assert_eq!(storage.pages().await.len(), 4);
    }

    #[tokio::test]
    async fn test_colliding_items_are_skipped_without_model_call() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![]));
        let generator = generator(
            &config(&dir),
            model.clone(),
            Arc::new(DummyImageSource::new()),
            Arc::new(InMemoryStorage::new()),
            Arc::new(RecordingSleeper::new()),
        );

        let existing = ExistingContent::new(
            vec!["BPC-157 Benefits: the Complete Guide".to_string()],
            vec![],
        );
        let items = vec![WorkItem::topic("BPC-157", "Benefits", "guide")];
        let summary = generator.run_items(&items, &existing).await;

        assert_eq!(summary, RunSummary { generated: 0, skipped: 1, errors: 0 });
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_batch_continues() {
        let dir = TempDir::new().unwrap();
        let short = json!({
            "title": "Short", "content": "Too short.", "excerpt": "e", "metaDescription": "m"
        })
        .to_string();
        let model = Arc::new(ScriptedModel::new(vec![
            Err("upstream 503".to_string()),
            Ok("I cannot write that.".to_string()),
            Ok(short),
            Ok(article_json("BPC-157 Dosage Explained", "BPC-157 dosing varies between studies.")),
        ]));
        let storage = Arc::new(InMemoryStorage::new());
        let generator = generator(
            &config(&dir),
            model.clone(),
            Arc::new(DummyImageSource::new()),
            storage.clone(),
            Arc::new(RecordingSleeper::new()),
        );

        let items = vec![
            WorkItem::topic("BPC-157", "Benefits", "guide"),
            WorkItem::topic("TB-500", "Benefits", "guide"),
            WorkItem::topic("TB-500", "Dosage", "guide"),
            WorkItem::topic("BPC-157", "Dosage", "guide"),
        ];
        let summary = generator.run_items(&items, &ExistingContent::default()).await;

        assert_eq!(summary, RunSummary { generated: 1, skipped: 0, errors: 3 });
        assert_eq!(model.calls(), 4);
        let pages = storage.pages().await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].slug.starts_with("bpc-157-dosage-explained-"));
        assert!(pages[0]
            .content
            .starts_with("## Overview\n\n[BPC-157](/products/bpc-157) dosing varies"));
    }

    #[tokio::test]
    async fn test_image_failures_do_not_affect_outcome() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let model = Arc::new(ScriptedModel::new(vec![Ok(article_json(
            "TB-500 Benefits",
            "TB-500 is studied for recovery.",
        ))]));
        let storage = Arc::new(InMemoryStorage::new());
        let generator = generator(
            &config,
            model,
            Arc::new(FailingImages),
            storage.clone(),
            Arc::new(RecordingSleeper::new()),
        );

        let items = vec![WorkItem::topic("TB-500", "Benefits", "guide")];
        let summary = generator.run_items(&items, &ExistingContent::default()).await;

        assert_eq!(summary.generated, 1);
        let page = &storage.pages().await[0];
        assert_eq!(page.cover_image.as_deref(), Some(config.images.fallback.as_str()));
        assert!(page.section_images.is_empty());
    }

    #[tokio::test]
    async fn test_section_images_are_capped() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.images.section_images = 10;

        let mut content = String::new();
        for n in 1..=5 {
            content.push_str(&format!("## Part {}\n\n", n));
            for _ in 0..2 {
                content.push_str("Research peptides need careful handling and storage. ");
                content.push_str("Studies differ in protocol and duration. ");
            }
            content.push_str("\n\n");
        }
        content.push_str("That is all for now.");
        let raw = json!({
            "title": "Handling Peptides",
            "content": content,
            "excerpt": "Excerpt.",
            "keywords": [],
            "metaDescription": "Meta.",
        })
        .to_string();

        let storage = Arc::new(InMemoryStorage::new());
        let generator = generator(
            &config,
            Arc::new(ScriptedModel::new(vec![Ok(raw)])),
            Arc::new(DummyImageSource::new()),
            storage.clone(),
            Arc::new(RecordingSleeper::new()),
        );

        let items = vec![WorkItem::topic("BPC-157", "Handling", "guide")];
        let summary = generator.run_items(&items, &ExistingContent::default()).await;
        assert_eq!(summary.generated, 1);
        assert_eq!(storage.pages().await[0].section_images.len(), MAX_SECTION_IMAGES);
    }

    #[tokio::test]
    async fn test_persistence_errors_are_counted() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(article_json("A", "Plain text about research.")),
            Ok(article_json("B", "More plain text about research.")),
        ]));
        let generator = generator(
            &config(&dir),
            model,
            Arc::new(DummyImageSource::new()),
            Arc::new(ReadOnlyStorage),
            Arc::new(RecordingSleeper::new()),
        );

        let items = vec![
            WorkItem::topic("BPC-157", "Benefits", "guide"),
            WorkItem::topic("TB-500", "Benefits", "guide"),
        ];
        let summary = generator.run_items(&items, &ExistingContent::default()).await;
        assert_eq!(summary, RunSummary { generated: 0, skipped: 0, errors: 2 });
    }

    #[tokio::test]
    async fn test_cross_links_to_published_pages() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .create(&PublishedPage {
                kind: PageKind::Topic,
                slug: "peptide-storage-abc123".to_string(),
                title: "Peptide Storage".to_string(),
                content: "Body.".to_string(),
                excerpt: String::new(),
                meta_description: String::new(),
                keywords: vec![],
                cover_image: None,
                section_images: vec![],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let model = Arc::new(ScriptedModel::new(vec![Ok(article_json(
            "BPC-157 vs TB-500",
            "Good peptide storage matters. See our product catalog.",
        ))]));
        let generator = generator(
            &config(&dir),
            model,
            Arc::new(DummyImageSource::new()),
            storage.clone(),
            Arc::new(RecordingSleeper::new()),
        );

        let items = vec![WorkItem::comparison("BPC-157", "TB-500")];
        let summary = generator.run_items(&items, &ExistingContent::default()).await;
        assert_eq!(summary.generated, 1);

        let page = storage
            .pages()
            .await
            .into_iter()
            .find(|p| p.kind == PageKind::Comparison)
            .unwrap();
        assert!(page.content.contains("Good [peptide storage](/guides/peptide-storage-abc123) matters."));
        assert!(page.content.contains("See our [product catalog](/products)."));
        assert!(page.slug.starts_with("bpc-157-vs-tb-500-"));
    }

    #[tokio::test]
    async fn test_dry_run_and_stop() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(InMemoryStorage::new());
        let generator = generator(
            &config(&dir),
            Arc::new(DummyModel::new()),
            Arc::new(DummyImageSource::new()),
            storage.clone(),
            Arc::new(RecordingSleeper::new()),
        )
        .with_dry_run(true);

        let summary = generator.run(2).await.unwrap();
        assert_eq!(summary.generated, 2);
        assert!(storage.pages().await.is_empty());

        generator.stop_handle().store(true, Ordering::SeqCst);
        let summary = generator.run(2).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
