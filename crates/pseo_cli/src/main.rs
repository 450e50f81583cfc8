use clap::Parser;
use pseo_core::{PageKind, PageStorage};
use pseo_generator::prelude::*;
use pseo_generator::init_logging;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    /// Accepts `500ms`, `2s`, `1m30s`, `1h`; a bare number is seconds.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = Duration::ZERO;
        let mut number = String::new();
        let mut chars = s.trim().chars().peekable();
        let mut parsed_any = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let value: u64 = number
                .parse()
                .map_err(|_| format!("Missing number before unit '{}'", c))?;
            number.clear();

            let part = match c {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    Some(Duration::from_millis(value))
                }
                's' => Some(Duration::from_secs(value)),
                'm' => value.checked_mul(60).map(Duration::from_secs),
                'h' => value.checked_mul(3600).map(Duration::from_secs),
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total = part
                .and_then(|part| total.checked_add(part))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            parsed_any = true;
        }

        if !number.is_empty() {
            let value: u64 = number.parse().map_err(|_| "Invalid number in duration".to_string())?;
            total = total
                .checked_add(Duration::from_secs(value))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            parsed_any = true;
        }

        if !parsed_any {
            return Err("Duration must include a number".to_string());
        }
        Ok(HumanDuration(total))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Programmatic SEO content generator", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "memory", env = "PSEO_STORAGE")]
    storage: String,
    /// SQLite database file
    #[arg(long, default_value = "pseo.db", env = "PSEO_DATABASE")]
    database: String,
    #[arg(long, default_value = "openai", help = "Content model provider. Available: openai (default), dummy")]
    model: String,
    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "PSEO_MODEL_URL")]
    model_url: Option<String>,
    #[arg(long, env = "PSEO_MODEL_NAME")]
    model_name: Option<String>,
    #[arg(long, env = "PSEO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "PSEO_IMAGE_MODEL")]
    image_model: Option<String>,
    /// TOML file with the content space, catalog and generation settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pause after every model or image call (e.g. 2s, 500ms)
    #[arg(long)]
    call_interval: Option<HumanDuration>,
    /// Pause between work items (e.g. 5s, 1m)
    #[arg(long)]
    item_interval: Option<HumanDuration>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Generate and publish a batch of pages
    Generate {
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
        /// Do everything except saving the pages
        #[arg(long)]
        dry_run: bool,
    },
    /// Show how much of the backlog is left and what comes next
    Backlog {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List published pages as link targets
    Published {
        /// article, comparison or topic. All kinds when omitted.
        #[arg(long)]
        kind: Option<PageKind>,
    },
}

impl Cli {
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("📄 Loading configuration from {}", path.display());
                GeneratorConfig::from_file(path)?
            }
            None => GeneratorConfig::default(),
        };

        if let Some(interval) = self.call_interval {
            config.throttle.between_calls_ms = u64::try_from(interval.0.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(interval) = self.item_interval {
            config.throttle.between_items_ms = u64::try_from(interval.0.as_millis()).unwrap_or(u64::MAX);
        }
        Ok(config)
    }

    fn inference_config(&self) -> pseo_inference::Config {
        pseo_inference::Config {
            provider: Some(self.model.clone()),
            api_key: self.api_key.clone(),
            base_url: self.model_url.clone(),
            model_name: self.model_name.clone(),
            image_model: self.image_model.clone(),
        }
    }
}

async fn generate(
    config: &GeneratorConfig,
    inference: &pseo_inference::Config,
    storage: Arc<dyn PageStorage>,
    batch_size: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    let model = pseo_inference::create_model(inference)?;
    info!("🧠 Content model initialized (using {})", model.name());
    let images = pseo_inference::create_image_source(inference)?;
    info!("🎨 Image source initialized (using {})", images.name());

    let generator = Generator::new(config, model, images, storage).with_dry_run(dry_run);

    let stop = generator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupted, finishing the current item");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let summary = generator.run(batch_size).await?;
    println!("generated: {}", summary.generated);
    println!("skipped:   {}", summary.skipped);
    println!("errors:    {}", summary.errors);
    println!("{}", summary);
    Ok(())
}

async fn backlog(config: &GeneratorConfig, storage: Arc<dyn PageStorage>, limit: usize) -> anyhow::Result<()> {
    let existing = storage.find_existing_titles_and_slugs().await?;
    let queue = build_queue(&config.content);

    println!("backlog:   {}", queue.len());
    println!("published: {}", existing.len());
    println!("remaining: {}", remaining(&queue, &existing));

    for item in next_batch(&queue, &existing, limit) {
        println!("  {} ({})", item.probable_title(), item.kind());
    }
    Ok(())
}

async fn published(storage: Arc<dyn PageStorage>, kind: Option<PageKind>) -> anyhow::Result<()> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => PageKind::ALL.to_vec(),
    };

    for kind in kinds {
        for link in storage.list_published(kind).await? {
            println!("{}\t{}\t{}", kind, link.url, link.text);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info");
    let cli = Cli::parse();

    let config = cli.generator_config()?;
    let storage = pseo_storage::create_storage(&cli.storage, Some(cli.database.as_str())).await?;

    match cli.command {
        Commands::Generate { batch_size, dry_run } => {
            generate(&config, &cli.inference_config(), storage, batch_size, dry_run).await?
        }
        Commands::Backlog { limit } => backlog(&config, storage, limit).await?,
        Commands::Published { kind } => published(storage, kind).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        let parse = |s: &str| HumanDuration::from_str(s).map(|d| d.0);
        assert_eq!(parse("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse("1h 5m"), Ok(Duration::from_secs(3900)));
        assert_eq!(parse("45"), Ok(Duration::from_secs(45)));
        assert!(parse("").is_err());
        assert!(parse("5x").is_err());
        assert!(parse("s").is_err());
    }

    #[test]
    fn test_human_duration_rejects_overflow() {
        let parse = |s: &str| HumanDuration::from_str(s).map(|d| d.0);
        assert!(parse("18446744073709551615h").unwrap_err().contains("too large"));
        assert!(parse("18446744073709551615m").is_err());
        assert!(parse("18446744073709551615s 18446744073709551615s").is_err());
        assert!(parse("99999999999999999999s").is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "pseo",
            "--model",
            "dummy",
            "--call-interval",
            "0s",
            "generate",
            "--batch-size",
            "3",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.model, "dummy");
        assert!(matches!(cli.command, Commands::Generate { batch_size: 3, dry_run: true }));

        let config = cli.generator_config().unwrap();
        assert_eq!(config.throttle.between_calls_ms, 0);
        assert_eq!(config.throttle.between_items_ms, 5_000);
    }

    #[test]
    fn test_cli_parses_published_kind() {
        let cli = Cli::try_parse_from(["pseo", "published", "--kind", "comparison"]).unwrap();
        assert!(matches!(cli.command, Commands::Published { kind: Some(PageKind::Comparison) }));
        assert!(Cli::try_parse_from(["pseo", "published", "--kind", "video"]).is_err());
    }

    #[tokio::test]
    async fn test_published_and_backlog_against_memory() {
        let storage = pseo_storage::create_storage("memory", None).await.unwrap();
        let config = GeneratorConfig::default();
        backlog(&config, storage.clone(), 3).await.unwrap();
        published(storage, None).await.unwrap();
    }
}
