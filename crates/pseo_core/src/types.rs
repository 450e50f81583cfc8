use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One unit of content to generate. Built by the scheduler for a single run
/// and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub subject: String,
    pub topic: String,
    pub intent: String,
    pub competitor: Option<String>,
}

pub const COMPARISON_TOPIC: &str = "comparison";

impl WorkItem {
    pub fn topic(subject: &str, topic: &str, intent: &str) -> Self {
        Self {
            subject: subject.to_string(),
            topic: topic.to_string(),
            intent: intent.to_string(),
            competitor: None,
        }
    }

    pub fn comparison(subject: &str, competitor: &str) -> Self {
        Self {
            subject: subject.to_string(),
            topic: COMPARISON_TOPIC.to_string(),
            intent: COMPARISON_TOPIC.to_string(),
            competitor: Some(competitor.to_string()),
        }
    }

    pub fn kind(&self) -> PageKind {
        if self.competitor.is_some() {
            PageKind::Comparison
        } else {
            PageKind::Article
        }
    }

    /// `(subject, topic, competitor-or-intent)`, lower-cased. Two items with
    /// the same key are duplicates for scheduling purposes.
    pub fn key(&self) -> (String, String, String) {
        let last = self.competitor.as_deref().unwrap_or(&self.intent);
        (
            self.subject.to_lowercase(),
            self.topic.to_lowercase(),
            last.to_lowercase(),
        )
    }

    /// The title this item will most likely be published under.
    pub fn probable_title(&self) -> String {
        match &self.competitor {
            Some(competitor) => format!("{} vs {}", self.subject, competitor),
            None => format!("{} {}", self.subject, self.topic),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.competitor {
            Some(competitor) => write!(f, "{} vs {}", self.subject, competitor),
            None => write!(f, "{} / {} / {}", self.subject, self.topic, self.intent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub text: String,
    pub url: String,
}

impl LinkCandidate {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Structured article recovered from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "metaDescription")]
    pub meta_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Article,
    Comparison,
    Topic,
}

impl PageKind {
    pub const ALL: [PageKind; 3] = [PageKind::Article, PageKind::Comparison, PageKind::Topic];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Article => "article",
            PageKind::Comparison => "comparison",
            PageKind::Topic => "topic",
        }
    }

    /// Storefront route under which pages of this kind are served.
    pub fn route_prefix(&self) -> &'static str {
        match self {
            PageKind::Article => "/blog",
            PageKind::Comparison => "/compare",
            PageKind::Topic => "/guides",
        }
    }

    pub fn url_for(&self, slug: &str) -> String {
        format!("{}/{}", self.route_prefix(), slug)
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" => Ok(PageKind::Article),
            "comparison" => Ok(PageKind::Comparison),
            "topic" => Ok(PageKind::Topic),
            other => Err(format!("Unknown page kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPage {
    pub kind: PageKind,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub cover_image: Option<String>,
    pub section_images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PublishedPage {
    pub fn link(&self) -> LinkCandidate {
        LinkCandidate::new(self.title.clone(), self.kind.url_for(&self.slug))
    }
}

/// Snapshot of what is already published, taken once per batch.
#[derive(Debug, Clone, Default)]
pub struct ExistingContent {
    titles: HashSet<String>,
    slugs: HashSet<String>,
}

impl ExistingContent {
    pub fn new<T, S>(titles: T, slugs: S) -> Self
    where
        T: IntoIterator<Item = String>,
        S: IntoIterator<Item = String>,
    {
        Self {
            titles: titles.into_iter().map(|t| t.to_lowercase()).collect(),
            slugs: slugs.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len().max(self.slugs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.slugs.is_empty()
    }

    /// True when an existing title contains `title` or an existing slug
    /// starts with `slug_prefix`. Case-insensitive. Empty probes never match.
    pub fn collides(&self, title: &str, slug_prefix: &str) -> bool {
        let title = title.trim().to_lowercase();
        let slug_prefix = slug_prefix.trim().to_lowercase();

        let title_hit = !title.is_empty() && self.titles.iter().any(|t| t.contains(&title));
        let slug_hit =
            !slug_prefix.is_empty() && self.slugs.iter().any(|s| s.starts_with(&slug_prefix));

        title_hit || slug_hit
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.generated + self.skipped + self.errors
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} item(s): {} generated, {} skipped as duplicates, {} failed",
            self.total(),
            self.generated,
            self.skipped,
            self.errors
        )
    }
}
