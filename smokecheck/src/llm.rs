//! One-shot probe of the LLM gateway: a single short chat completion per
//! configured model, authorized with that provider's API key from the
//! environment.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const PROBE_PROMPT: &str = "Reply with the single word OK.";
const MAX_REASON_LEN: usize = 100;

/// One model to probe, with the environment variable holding its key.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelProbe {
    pub model: String,
    pub env_key: String,
    pub label: String,
}

#[derive(Debug, PartialEq)]
pub enum ProbeOutcome {
    Passed {
        reply: String,
        /// Model identifier the gateway reports serving, which may differ
        /// from the one requested when the gateway rewrites routes.
        served_model: String,
    },
    Skipped {
        env_key: String,
    },
    Failed {
        reason: FailureReason,
    },
}

#[derive(Debug, PartialEq)]
pub enum FailureReason {
    InvalidApiKey,
    RateLimited,
    ModelNotFound,
    EmptyReply,
    Other(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::InvalidApiKey => write!(f, "invalid API key"),
            FailureReason::RateLimited => write!(f, "rate limited"),
            FailureReason::ModelNotFound => write!(f, "model not found"),
            FailureReason::EmptyReply => write!(f, "empty or invalid reply"),
            FailureReason::Other(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
}

pub struct GatewayCheck {
    client: reqwest::Client,
    completions_url: String,
}

impl GatewayCheck {
    pub fn new(base_url: &str) -> Self {
        GatewayCheck {
            client: reqwest::Client::new(),
            completions_url: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    /// Probes every model in order, resolving each API key from the process
    /// environment. A missing key skips the probe rather than failing it.
    pub async fn run(&self, probes: &[ModelProbe]) -> Vec<(ModelProbe, ProbeOutcome)> {
        let mut results = Vec::with_capacity(probes.len());

        for probe in probes {
            let outcome = match std::env::var(&probe.env_key)
                .ok()
                .filter(|key| !key.is_empty())
            {
                Some(key) => self.probe_model(probe, &key).await,
                None => ProbeOutcome::Skipped {
                    env_key: probe.env_key.clone(),
                },
            };
            results.push((probe.clone(), outcome));
        }

        results
    }

    /// Sends one fixed chat completion request. Never retries.
    pub async fn probe_model(&self, probe: &ModelProbe, api_key: &str) -> ProbeOutcome {
        let request = ChatRequest {
            model: &probe.model,
            messages: [ChatMessage {
                role: "user",
                content: PROBE_PROMPT,
            }],
            max_tokens: 10,
            temperature: 0.0,
        };

        let response = match self
            .client
            .post(&self.completions_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return ProbeOutcome::Failed {
                    reason: FailureReason::Other(truncate(&err.to_string())),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(model = %probe.model, %status, "gateway probe rejected");
            return ProbeOutcome::Failed {
                reason: classify_failure(status, &body),
            };
        }

        match response.json::<ChatResponse>().await {
            Ok(parsed) => {
                let reply = parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .map(|content| content.trim().to_string())
                    .filter(|content| !content.is_empty());

                match reply {
                    Some(reply) => ProbeOutcome::Passed {
                        reply,
                        served_model: parsed.model,
                    },
                    None => ProbeOutcome::Failed {
                        reason: FailureReason::EmptyReply,
                    },
                }
            }
            Err(err) => ProbeOutcome::Failed {
                reason: FailureReason::Other(truncate(&err.to_string())),
            },
        }
    }
}

fn classify_failure(status: StatusCode, body: &str) -> FailureReason {
    let lowered = body.to_lowercase();

    if status == StatusCode::UNAUTHORIZED || lowered.contains("invalid api key") {
        FailureReason::InvalidApiKey
    } else if status == StatusCode::TOO_MANY_REQUESTS || lowered.contains("rate limit") {
        FailureReason::RateLimited
    } else if status == StatusCode::NOT_FOUND || lowered.contains("not found") {
        FailureReason::ModelNotFound
    } else {
        FailureReason::Other(truncate(body))
    }
}

fn truncate(message: &str) -> String {
    let head: String = message.chars().take(MAX_REASON_LEN).collect();
    if head.len() == message.len() {
        head
    } else {
        format!("{head}...")
    }
}
