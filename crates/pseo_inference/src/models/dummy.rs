use std::fmt;
use async_trait::async_trait;
use pseo_core::{CompletionRequest, ContentModel, Result};
use serde_json::json;

/// Line in the user prompt the dummy model picks its title from.
pub const TITLE_HINT: &str = "Working title:";

/// Offline model that answers every prompt with a well-formed article, so
/// the pipeline can run end to end without network access.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }

    fn title_from(prompt: &str) -> String {
        prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(TITLE_HINT))
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Untitled Draft".to_string())
    }
}

#[async_trait]
impl ContentModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let title = Self::title_from(&request.user_prompt);
        let sections = ["Overview", "What the Research Says", "Practical Considerations"];

        let mut content = String::new();
        for heading in sections {
            content.push_str(&format!("## {}\n\n", heading));
            content.push_str(&format!(
                "This section covers {} in plain language. It summarizes what is known, \
                 what remains uncertain and what readers should keep in mind before drawing \
                 conclusions. Every claim here is general information and not medical advice.\n\n",
                title
            ));
            content.push_str(
                "Quality, storage and sourcing matter as much as the compound itself. \
                 Look for published certificates of analysis and consistent handling.\n\n",
            );
        }
        content.push_str("Always consult a qualified professional before acting on anything you read.");

        let article = json!({
            "title": title,
            "content": content,
            "excerpt": format!("A practical look at {}.", title),
            "keywords": title.to_lowercase().split_whitespace().collect::<Vec<_>>(),
            "metaDescription": format!("Learn about {} with a clear, research-focused overview.", title),
        });
        Ok(article.to_string())
    }
}
