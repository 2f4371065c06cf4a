use crate::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use idmltrans_core::glossary::Glossary;
use idmltrans_core::language::TargetLanguage;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Batches are sized by a rough token estimate: one token per four
/// characters plus prompt overhead per text.
const TOKEN_ESTIMATE_OVERHEAD: usize = 100;
const MAX_BATCH_TOKENS: usize = 3000;

const MAX_RETRIES: u32 = 3;
const MAX_COMPLETION_TOKENS: u32 = 4000;

/// Chat-completions client for batch text translation.
///
/// Low temperature keeps terminology stable across batches. A batch that
/// still fails after retries falls back to its original texts so one bad
/// response never aborts a whole document run.
pub struct Translator {
    client: reqwest::Client,
    model: String,
}

impl Translator {
    /// Builds a client authenticated from the `OPENAI_API_KEY` environment
    /// variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| eyre!("OPENAI_API_KEY environment variable not set"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&f!("Bearer {api_key}"))
                .map_err(|e| eyre!("Invalid header value: {}", e))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Translator {
            client,
            model: model.into(),
        })
    }

    /// Translates all texts, batching by estimated token budget. Output
    /// order matches input order.
    pub async fn translate_texts(
        &self,
        texts: &[String],
        language: TargetLanguage,
        glossary: &Glossary,
        mut on_batch_done: impl FnMut(usize),
    ) -> Result<Vec<String>> {
        let mut translations = Vec::with_capacity(texts.len());

        for batch in batch_texts(texts) {
            let result = self.translate_batch(batch, language, glossary).await;
            match result {
                Ok(batch_translations) => translations.extend(batch_translations),
                Err(e) => {
                    log::warn!("batch of {} texts failed, keeping originals: {e}", batch.len());
                    translations.extend(batch.iter().cloned());
                }
            }
            on_batch_done(batch.len());
        }

        Ok(translations)
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        language: TargetLanguage,
        glossary: &Glossary,
    ) -> Result<Vec<String>> {
        let context = batch_protection_note(texts, glossary);
        let prompt = translation_prompt(texts, language, context.as_deref());

        let mut last_error = eyre!(Error::Api("no attempts made".to_string()));
        for attempt in 0..MAX_RETRIES {
            match self.request(&prompt).await {
                Ok(content) => {
                    return Ok(parse_numbered_response(&content, texts));
                }
                Err(e) => {
                    log::warn!("translation attempt {} failed: {e}", attempt + 1);
                    last_error = e;
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(std::time::Duration::from_secs(1 << attempt)).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let response = self
            .client
            .post(f!("{OPENAI_API_BASE}/chat/completions"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!(Error::Api(f!("{status}: {body}"))));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| eyre!(Error::InvalidResponse("response has no choices".to_string())))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Splits texts into batches that stay under the token budget. Every batch
/// holds at least one text, so oversized single texts still go through.
fn batch_texts(texts: &[String]) -> Vec<&[String]> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut budget = 0;

    for (i, text) in texts.iter().enumerate() {
        let estimate = text.chars().count() / 4 + TOKEN_ESTIMATE_OVERHEAD;
        if budget + estimate > MAX_BATCH_TOKENS && i > start {
            batches.push(&texts[start..i]);
            start = i;
            budget = 0;
        }
        budget += estimate;
    }
    if start < texts.len() {
        batches.push(&texts[start..]);
    }
    batches
}

/// One protection note covering every protected term in the batch, used as
/// the prompt's CONTEXT line.
fn batch_protection_note(texts: &[String], glossary: &Glossary) -> Option<String> {
    let joined = texts.join("\n");
    glossary.protection_note(&joined)
}

fn translation_prompt(
    texts: &[String],
    language: TargetLanguage,
    context: Option<&str>,
) -> String {
    let mut prompt = f!(
        "Translate the following texts from Italian to {}.\n\n\
         IMPORTANT INSTRUCTIONS:\n\
         - Maintain the exact same format and structure\n\
         - Keep any special characters or formatting\n\
         - Preserve the tone and style of the original text\n\
         - Return exactly {} translations, one per line\n\
         - Each translation should correspond to the input text at the same position\n\
         - Do not add explanations or additional text\n",
        language.name(),
        texts.len()
    );

    if let Some(context) = context {
        prompt.push_str(&f!("\nCONTEXT: {context}\n"));
    }

    prompt.push_str("\nTEXTS TO TRANSLATE:\n");
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&f!("{}. {text}\n", i + 1));
    }
    prompt.push_str(&f!(
        "\nProvide {} translations, numbered from 1 to {}:",
        texts.len(),
        texts.len()
    ));

    prompt
}

/// Extracts numbered translations from the model's response.
///
/// Lines that do not start with `N.` or `N)` are ignored. A count mismatch
/// is corrected against the originals: missing entries fall back to the
/// source text, excess entries are dropped.
fn parse_numbered_response(response: &str, originals: &[String]) -> Vec<String> {
    let line_pattern = Regex::new(r"^\d+[.)]\s*(.+)").unwrap();
    let mut translations = Vec::new();

    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(captures) = line_pattern.captures(line) {
            let translation = captures[1].trim().to_string();
            if !translation.is_empty() {
                translations.push(translation);
            }
        }
    }

    if translations.len() != originals.len() {
        log::warn!(
            "expected {} translations, received {}",
            originals.len(),
            translations.len()
        );
        while translations.len() < originals.len() {
            translations.push(originals[translations.len()].clone());
        }
        translations.truncate(originals.len());
    }

    translations
}
