//! [`MaterialGenerator`] backed by an HTTP flow server.
//!
//! Each generator is a flow invoked as `POST {base_url}/{flow}` with body
//! `{"data": {"text": "..."}}`; a successful call answers
//! `{"result": ...}`. A 422, or any failure whose body mentions `SAFETY`, is a
//! moderation refusal.

use std::time::Duration;

use cram_core::{
  generate::{GenerationError, MaterialGenerator},
  topic::{NewFlashcard, NewTestQuestion, QuestionKind},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const SUMMARIZE_FLOW: &str = "summarizeTextFlow";
const FLASHCARDS_FLOW: &str = "generateFlashcardsFlow";
const TEST_QUESTIONS_FLOW: &str = "generateTestQuestionsFlow";

/// Where the generation service lives. Read from the `[generator]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
  pub base_url:     String,
  /// Sent as a bearer token when set.
  pub api_key:      Option<String>,
  pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      base_url:     "http://127.0.0.1:3400".to_owned(),
      api_key:      None,
      timeout_secs: 120,
    }
  }
}

/// HTTP client for the generation flows.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpGenerator {
  client: Client,
  config: GeneratorConfig,
}

#[derive(Serialize)]
struct FlowRequest<'a> {
  data: TextInput<'a>,
}

#[derive(Serialize)]
struct TextInput<'a> {
  text: &'a str,
}

#[derive(Deserialize)]
struct FlowResponse<T> {
  result: T,
}

#[derive(Deserialize)]
struct SummaryOutput {
  summary: String,
}

#[derive(Deserialize)]
struct FlashcardsOutput {
  flashcards: Vec<NewFlashcard>,
}

#[derive(Deserialize)]
struct QuestionsOutput {
  questions: Vec<WireQuestion>,
}

#[derive(Deserialize)]
struct WireQuestion {
  #[serde(rename = "type")]
  kind:     QuestionKind,
  question: String,
  #[serde(default)]
  options:  Vec<String>,
  answer:   String,
}

impl From<WireQuestion> for NewTestQuestion {
  fn from(q: WireQuestion) -> Self {
    NewTestQuestion {
      kind:     q.kind,
      question: q.question,
      options:  q.options,
      answer:   q.answer,
    }
  }
}

impl HttpGenerator {
  pub fn new(config: GeneratorConfig) -> reqwest::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, flow: &str) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), flow)
  }

  async fn run_flow<T: DeserializeOwned>(
    &self,
    flow: &str,
    text: &str,
  ) -> Result<T, GenerationError> {
    let mut req = self
      .client
      .post(self.url(flow))
      .json(&FlowRequest { data: TextInput { text } });
    if let Some(key) = &self.config.api_key {
      req = req.bearer_auth(key);
    }

    let resp = req.send().await.map_err(GenerationError::failed)?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      if status == StatusCode::UNPROCESSABLE_ENTITY || body.contains("SAFETY") {
        return Err(GenerationError::Refused(body));
      }
      return Err(GenerationError::Failed(
        format!("{flow} → {status}: {body}").into(),
      ));
    }

    let out: FlowResponse<T> = resp.json().await.map_err(GenerationError::failed)?;
    Ok(out.result)
  }
}

impl MaterialGenerator for HttpGenerator {
  async fn summarize(&self, text: &str) -> Result<String, GenerationError> {
    let out: SummaryOutput = self.run_flow(SUMMARIZE_FLOW, text).await?;
    Ok(out.summary)
  }

  async fn flashcards(&self, text: &str) -> Result<Vec<NewFlashcard>, GenerationError> {
    let out: FlashcardsOutput = self.run_flow(FLASHCARDS_FLOW, text).await?;
    Ok(out.flashcards)
  }

  async fn test_questions(
    &self,
    text: &str,
  ) -> Result<Vec<NewTestQuestion>, GenerationError> {
    let out: QuestionsOutput = self.run_flow(TEST_QUESTIONS_FLOW, text).await?;
    Ok(out.questions.into_iter().map(NewTestQuestion::from).collect())
  }
}
