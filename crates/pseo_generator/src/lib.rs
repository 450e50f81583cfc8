pub mod catalog;
pub mod config;
pub mod generator;
pub mod images;
pub mod linker;
pub mod logging;
pub mod parser;
pub mod prompts;
pub mod scheduler;
pub mod slug;
pub mod throttle;

#[cfg(test)]
mod test_utils;

pub use config::GeneratorConfig;
pub use generator::{Generator, ItemOutcome};
pub use logging::{init_logging, Logger};

pub mod prelude {
    pub use super::catalog::{CatalogProduct, LinkCatalog};
    pub use super::config::GeneratorConfig;
    pub use super::generator::{Generator, ItemOutcome};
    pub use super::scheduler::{build_queue, next_batch, remaining, ContentSpace, WorkQueue};
    pub use super::throttle::RateLimiter;
    pub use pseo_core::{Error, Result, RunSummary, WorkItem};
}
