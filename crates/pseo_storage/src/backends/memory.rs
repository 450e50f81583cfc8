use async_trait::async_trait;
use pseo_core::{ExistingContent, LinkCandidate, PageKind, PageStorage, PublishedPage, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    pages: Vec<PublishedPage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, page: &PublishedPage) -> Result<()> {
        if self.pages.iter().any(|p| p.slug == page.slug) {
            return Err(pseo_core::Error::Storage(format!(
                "Slug already exists: {}",
                page.slug
            )));
        }
        self.pages.push(page.clone());
        Ok(())
    }

    pub fn existing(&self) -> ExistingContent {
        ExistingContent::new(
            self.pages.iter().map(|p| p.title.clone()),
            self.pages.iter().map(|p| p.slug.clone()),
        )
    }

    pub fn list_published(&self, kind: PageKind) -> Vec<LinkCandidate> {
        let mut pages: Vec<&PublishedPage> = self.pages.iter().filter(|p| p.kind == kind).collect();
        pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pages.into_iter().map(|p| p.link()).collect()
    }
}

/// Process-local sink, used for dry runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pages(&self) -> Vec<PublishedPage> {
        self.store.read().await.pages.clone()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_location: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl PageStorage for InMemoryStorage {
    async fn find_existing_titles_and_slugs(&self) -> Result<ExistingContent> {
        Ok(self.store.read().await.existing())
    }

    async fn create(&self, page: &PublishedPage) -> Result<()> {
        self.store.write().await.create(page)
    }

    async fn list_published(&self, kind: PageKind) -> Result<Vec<LinkCandidate>> {
        Ok(self.store.read().await.list_published(kind))
    }
}
