use async_trait::async_trait;
use crate::types::{ExistingContent, LinkCandidate, PageKind, PublishedPage};
use crate::Result;

#[async_trait]
pub trait PageStorage: Send + Sync {
    /// Titles and slugs of everything already published, across all kinds
    async fn find_existing_titles_and_slugs(&self) -> Result<ExistingContent>;

    /// Persist a finished page. Fails with `Error::Storage` when the slug is taken.
    async fn create(&self, page: &PublishedPage) -> Result<()>;

    /// Published pages of one kind as (title, url) link candidates
    async fn list_published(&self, kind: PageKind) -> Result<Vec<LinkCandidate>>;
}
