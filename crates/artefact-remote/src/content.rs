//! Content generation: pick one source item and turn it into an artefact brief.

use artefact_types::{CalendarKey, GeneratedContent, RecentEntry, SourceItem};
use async_trait::async_trait;

use crate::chat::{ChatClient, ChatConfig};
use crate::error::{RemoteError, Result, ServiceKind};

/// Produces one structured pick from candidate sources.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// `recent` lists earlier picks the generator should not repeat.
    async fn generate(
        &self,
        key: CalendarKey,
        sources: &[SourceItem],
        recent: &[RecentEntry],
    ) -> Result<GeneratedContent>;
}

const SYSTEM_PROMPT: &str = r#"You curate a daily digital keepsake.
From the news items provided, choose the single story with the most absurdity,
human tension, technological irony or environmental warning. Skip dry politics
and market moves. Do not depict the news literally: find a metaphor and express
it as ONE standalone physical object.

Write like a private note to a clever friend: playful or wry, but warm.
If a recent pick covered the same theme, choose the next most interesting item.

The model_prompt feeds an image and 3D generator. Structure it as
[subject] + [material / texture] + [style] + [lighting / render settings],
describe a single isolated object with concrete detail, and prefer styles that
generate well such as "claymation style", "toy figure" or "hyper-realistic product shot".

Reply with a JSON object with exactly these fields:
{
  "title": string,
  "description": string,
  "latitude": number,
  "longitude": number,
  "location_name": string,
  "model_prompt": string (English, detailed),
  "source_event": string
}"#;

/// Build the user message: numbered sources followed by the exclusion list.
pub fn build_user_prompt(key: CalendarKey, sources: &[SourceItem], recent: &[RecentEntry]) -> String {
    let news = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}\n   {}", i + 1, s.title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!("Today is {key}. Candidate news:\n\n{news}");
    if !recent.is_empty() {
        prompt.push_str("\n\nAlready published recently, do not pick the same event again:\n");
        for entry in recent {
            prompt.push_str(&format!(
                "- {}: {} ({})\n",
                entry.key, entry.title, entry.source_event
            ));
        }
    }
    prompt.push_str("\n\nPick the most interesting item and produce today's content.");
    prompt
}

/// Parse the generator's JSON reply, rejecting blank required text.
pub fn parse_content(raw: &str) -> Result<GeneratedContent> {
    let content: GeneratedContent = serde_json::from_str(raw.trim())
        .map_err(|e| RemoteError::decode(ServiceKind::ContentGenerator, e))?;

    for (field, value) in [
        ("title", &content.title),
        ("model_prompt", &content.model_prompt),
    ] {
        if value.trim().is_empty() {
            return Err(RemoteError::Service {
                kind: ServiceKind::ContentGenerator,
                status: None,
                message: format!("generated content has an empty '{field}'"),
            });
        }
    }
    Ok(content)
}

/// Content generator backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiContentGenerator {
    chat: ChatClient,
}

impl OpenAiContentGenerator {
    pub fn new(config: ChatConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(config, ServiceKind::ContentGenerator)?,
        })
    }
}

#[async_trait]
impl ContentGenerator for OpenAiContentGenerator {
    async fn generate(
        &self,
        key: CalendarKey,
        sources: &[SourceItem],
        recent: &[RecentEntry],
    ) -> Result<GeneratedContent> {
        if sources.is_empty() {
            return Err(RemoteError::EmptyResponse(ServiceKind::SourceSearch));
        }
        let user = build_user_prompt(key, sources, recent);
        let raw = self.chat.complete_json(Some(SYSTEM_PROMPT), &user).await?;
        let content = parse_content(&raw)?;

        tracing::info!(key = %key, title = %content.title, "Content generated");
        Ok(content)
    }
}
