use async_trait::async_trait;
use pseo_core::{PageStorage, Result};
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: PageStorage + Sized {
    fn get_error_message() -> &'static str;

    /// Open the backend. `location` is backend specific (a file path for SQLite).
    async fn open(location: Option<&str>) -> Result<Self>;
}

async fn open_backend<T: StorageBackend + 'static>(location: Option<&str>) -> Result<Arc<dyn PageStorage>> {
    let storage = T::open(location).await.map_err(|e| {
        pseo_core::Error::Storage(format!("{} ({})", T::get_error_message(), e))
    })?;
    Ok(Arc::new(storage))
}

/// Build the storage backend named on the command line.
pub async fn create_storage(kind: &str, location: Option<&str>) -> Result<Arc<dyn PageStorage>> {
    let storage = match kind {
        "memory" => open_backend::<InMemoryStorage>(location).await?,
        #[cfg(feature = "sqlite")]
        "sqlite" => open_backend::<SQLiteStorage>(location).await?,
        other => {
            return Err(pseo_core::Error::Config(format!(
                "Unsupported storage backend: {}",
                other
            )))
        }
    };
    info!("🏦 Storage backend ready (using {})", kind);
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend};
}
