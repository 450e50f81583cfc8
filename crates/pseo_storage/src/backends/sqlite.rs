use async_trait::async_trait;
use pseo_core::{ExistingContent, LinkCandidate, PageKind, PageStorage, PublishedPage, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::StorageBackend;

const DEFAULT_DB_PATH: &str = "pseo.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        slug TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        meta_description TEXT NOT NULL,
        keywords TEXT NOT NULL,
        cover_image TEXT,
        section_images TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        slug TEXT PRIMARY KEY,
        type TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT NOT NULL,
        meta_description TEXT NOT NULL,
        keywords TEXT NOT NULL,
        cover_image TEXT,
        section_images TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS pages_type_idx ON pages (type)",
];

/// Persistence sink backed by two tables: `articles` for blog articles and
/// `pages` for comparison and topic pages. Slugs are unique across both.
pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable (default ./pseo.db)"
    }

    async fn open(location: Option<&str>) -> Result<Self> {
        let db_path = PathBuf::from(location.unwrap_or(DEFAULT_DB_PATH));
        Self::new_with_path(&db_path).await
    }
}

fn db_error(context: &str, e: sqlx::Error) -> pseo_core::Error {
    pseo_core::Error::Database(format!("{}: {}", context, e))
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(*migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn slug_taken(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM articles WHERE slug = ?)
                 + (SELECT COUNT(*) FROM pages WHERE slug = ?) AS n
            "#,
        )
        .bind(slug)
        .bind(slug)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to check slug", e))?;

        Ok(row.get::<i64, _>("n") > 0)
    }
}

#[async_trait]
impl PageStorage for SQLiteStorage {
    async fn find_existing_titles_and_slugs(&self) -> Result<ExistingContent> {
        let rows = sqlx::query(
            r#"
            SELECT title, slug FROM articles
            UNION ALL
            SELECT title, slug FROM pages
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to load existing titles", e))?;

        let mut titles = Vec::with_capacity(rows.len());
        let mut slugs = Vec::with_capacity(rows.len());
        for row in rows {
            titles.push(row.get::<String, _>("title"));
            slugs.push(row.get::<String, _>("slug"));
        }
        Ok(ExistingContent::new(titles, slugs))
    }

    async fn create(&self, page: &PublishedPage) -> Result<()> {
        if self.slug_taken(&page.slug).await? {
            return Err(pseo_core::Error::Storage(format!(
                "Slug already exists: {}",
                page.slug
            )));
        }

        let keywords = serde_json::to_string(&page.keywords)?;
        let section_images = serde_json::to_string(&page.section_images)?;

        let sql = match page.kind {
            PageKind::Article => {
                r#"
                INSERT INTO articles
                (slug, title, content, excerpt, meta_description, keywords, cover_image, section_images, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            }
            PageKind::Comparison | PageKind::Topic => {
                r#"
                INSERT INTO pages
                (slug, title, content, excerpt, meta_description, keywords, cover_image, section_images, created_at, type)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            }
        };

        let mut query = sqlx::query(sql)
            .bind(page.slug.as_str())
            .bind(page.title.as_str())
            .bind(page.content.as_str())
            .bind(page.excerpt.as_str())
            .bind(page.meta_description.as_str())
            .bind(keywords)
            .bind(page.cover_image.as_deref())
            .bind(section_images)
            .bind(page.created_at.to_rfc3339());
        if page.kind != PageKind::Article {
            query = query.bind(page.kind.as_str());
        }

        query.execute(&*self.pool).await.map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                pseo_core::Error::Storage(format!("Slug already exists: {}", page.slug))
            }
            other => db_error("Failed to store page", other),
        })?;

        Ok(())
    }

    async fn list_published(&self, kind: PageKind) -> Result<Vec<LinkCandidate>> {
        let rows = match kind {
            PageKind::Article => {
                sqlx::query("SELECT title, slug FROM articles ORDER BY created_at DESC")
                    .fetch_all(&*self.pool)
                    .await
            }
            _ => {
                sqlx::query("SELECT title, slug FROM pages WHERE type = ? ORDER BY created_at DESC")
                    .bind(kind.as_str())
                    .fetch_all(&*self.pool)
                    .await
            }
        }
        .map_err(|e| db_error("Failed to list published pages", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let slug: String = row.get("slug");
                LinkCandidate::new(row.get::<String, _>("title"), kind.url_for(&slug))
            })
            .collect())
    }
}
