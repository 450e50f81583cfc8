use pseo_core::{CompletionRequest, WorkItem};
use crate::config::ModelSettings;

pub const SYSTEM_PROMPT: &str = "You are an experienced science writer for an online research-peptide store. \
Write accurate, well-structured long-form articles in markdown for a general audience. \
Never make medical claims or give personal dosing advice; present research findings neutrally. \
Respond with ONLY one JSON object and nothing else, using exactly these keys: \
\"title\" (string), \"content\" (markdown string of at least 1200 words with ## section headings), \
\"excerpt\" (one or two sentences), \"keywords\" (array of 5 to 8 strings), \
\"metaDescription\" (at most 160 characters). Escape newlines inside strings as \\n. \
Finish the final sentence of the article.";

/// Prompt for the model, built from the work item.
pub fn article_request(item: &WorkItem, settings: &ModelSettings) -> CompletionRequest {
    let user_prompt = match &item.competitor {
        Some(competitor) => format!(
            "Write a balanced comparison article: {subject} vs {competitor}.\n\
             Cover mechanisms, research status, typical study protocols, stability and storage, \
             and which research questions suit each compound.\n\
             Include a markdown comparison table.\n\
             Working title: {title}\n",
            subject = item.subject,
            competitor = competitor,
            title = item.probable_title(),
        ),
        None => format!(
            "Write an article about {subject}, focused on: {topic}.\n\
             Search intent to satisfy: {intent}.\n\
             Mention our product catalog where it helps the reader, and end with a short summary.\n\
             Working title: {title}\n",
            subject = item.subject,
            topic = item.topic,
            intent = item.intent,
            title = item.probable_title(),
        ),
    };

    CompletionRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

pub fn cover_image_prompt(title: &str, item: &WorkItem) -> String {
    format!(
        "Editorial cover photo for an article titled \"{}\". Clean laboratory setting, \
         research vials labelled {}, soft natural light, no text, no people.",
        title, item.subject
    )
}

pub fn section_image_prompt(heading: &str, item: &WorkItem) -> String {
    format!(
        "Minimal illustration for a section called \"{}\" in an article about {}. \
         Scientific, muted colors, no text.",
        heading, item.subject
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_prompt() {
        let item = WorkItem::topic("BPC-157", "Benefits", "beginner guide");
        let request = article_request(&item, &ModelSettings::default());

        assert_eq!(request.system_prompt, SYSTEM_PROMPT);
        assert!(request.user_prompt.contains("about BPC-157, focused on: Benefits"));
        assert!(request.user_prompt.contains("intent to satisfy: beginner guide"));
        assert!(request.user_prompt.contains("Working title: BPC-157 Benefits\n"));
        assert_eq!(request.max_tokens, 4000);
    }

    #[test]
    fn test_comparison_prompt() {
        let item = WorkItem::comparison("BPC-157", "TB-500");
        let request = article_request(&item, &ModelSettings { temperature: 0.2, max_tokens: 10 });

        assert!(request.user_prompt.contains("BPC-157 vs TB-500"));
        assert!(request.user_prompt.contains("comparison table"));
        assert_eq!(request.temperature, 0.2);
    }

    #[test]
    fn test_image_prompts_mention_subject() {
        let item = WorkItem::topic("GHK-Cu", "Benefits", "guide");
        assert!(cover_image_prompt("GHK-Cu Explained", &item).contains("GHK-Cu Explained"));
        assert!(section_image_prompt("Storage", &item).contains("about GHK-Cu"));
    }
}
