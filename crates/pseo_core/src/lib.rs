pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub use models::{CompletionRequest, ContentModel, ImageOutput, ImageSource};
pub use storage::PageStorage;
pub use types::{
    ExistingContent, GeneratedArticle, LinkCandidate, PageKind, PublishedPage, RunSummary,
    WorkItem,
};

pub type Result<T> = std::result::Result<T, Error>;
