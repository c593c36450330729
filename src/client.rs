use reqwest::Method;
use uuid::Uuid;

use crate::config::{Config, PollErrorPolicy};
use crate::error::DeepWikiError;
use crate::response::{self, PollState};
use crate::transport::{Outcome, Transport, TransportFailure};

/// Engine identifier the wiki frontend submits with every question.
const ENGINE_ID: &str = "multihop";
/// Fixed keyword list carried verbatim from the frontend payload.
const KEYWORDS: [&str; 1] = ["通过http"];

/// Orchestrates one query lifecycle: submit, bounded poll loop, assembly.
///
/// Each `query` call is independent and owns a fresh generated id, so calls
/// may run concurrently on the shared transport without coordination.
pub struct DeepWikiClient {
    transport: Transport,
    config: Config,
}

impl DeepWikiClient {
    pub fn new(config: Config) -> Self {
        Self {
            transport: Transport::new(),
            config,
        }
    }

    /// Release the underlying HTTP handle. Queries issued after this fail
    /// with `SubmitFailed`.
    pub fn close(&self) {
        self.transport.close();
    }

    /// Ask `prompt` about `repo_name` and wait for the assembled answer.
    ///
    /// `repo_name` must be an `owner/name` pair; the remote behavior for any
    /// other shape is undefined and validation is the caller's job.
    pub async fn query(&self, repo_name: &str, prompt: &str) -> Result<String, DeepWikiError> {
        let query_id = Uuid::new_v4().to_string();
        tracing::debug!(repo = repo_name, query_id, "starting query");

        self.submit(repo_name, prompt, &query_id).await?;
        self.poll(&query_id).await
    }

    /// The wiki frontend wraps the user's question in a page-context
    /// preamble naming the repository (second path segment).
    fn compose_user_query(repo_name: &str, prompt: &str) -> String {
        let page = repo_name.split('/').nth(1).unwrap_or(repo_name);
        format!(
            "<relevant_context>This query was sent from the wiki page: \
             {page} Overview.</relevant_context> {prompt}"
        )
    }

    async fn submit(
        &self,
        repo_name: &str,
        prompt: &str,
        query_id: &str,
    ) -> Result<(), DeepWikiError> {
        let payload = serde_json::json!({
            "engine_id": ENGINE_ID,
            "user_query": Self::compose_user_query(repo_name, prompt),
            "keywords": KEYWORDS,
            "repo_names": [repo_name],
            "additional_context": "",
            "query_id": query_id,
            "use_notes": false,
            "generate_summary": false,
        });

        let outcome = self
            .transport
            .request(Method::POST, &self.config.base_url, Some(&payload))
            .await;

        if !outcome.ok {
            return Err(DeepWikiError::SubmitFailed {
                message: describe_failure(&outcome),
            });
        }

        // The service acknowledges with a truthy "status"; anything else is
        // a rejection. Submission is never retried.
        let accepted = outcome
            .data
            .as_ref()
            .and_then(|body| body.get("status"))
            .is_some_and(truthy);

        if !accepted {
            return Err(DeepWikiError::SubmitFailed {
                message: "service did not acknowledge the query".to_string(),
            });
        }

        tracing::debug!(query_id, "query submitted, polling");
        Ok(())
    }

    async fn poll(&self, query_id: &str) -> Result<String, DeepWikiError> {
        let url = format!("{}/{}", self.config.base_url, query_id);
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.poll_interval).await;
            }
            tracing::debug!(
                query_id,
                attempt = attempt + 1,
                max_attempts,
                "fetching poll status"
            );

            let outcome = self.transport.request(Method::GET, &url, None).await;
            let state = if outcome.ok {
                response::classify(outcome.data)
            } else {
                PollState::Unusable
            };

            match state {
                PollState::Pending => {}
                PollState::Done(text) => {
                    tracing::debug!(query_id, attempt = attempt + 1, "answer complete");
                    return Ok(text);
                }
                // The service's error state is permanent for this id; there
                // is no resubmission path, so polling on would only burn the
                // budget.
                PollState::Errored => {
                    tracing::error!(query_id, "service reported error state");
                    return Err(DeepWikiError::ResponseError {
                        query_id: query_id.to_string(),
                    });
                }
                PollState::Unusable => match self.config.poll_error_policy {
                    PollErrorPolicy::Fatal => {
                        tracing::error!(query_id, "poll fetch unusable, aborting");
                        return Err(DeepWikiError::ResponseError {
                            query_id: query_id.to_string(),
                        });
                    }
                    PollErrorPolicy::Retry => {
                        tracing::warn!(
                            query_id,
                            attempt = attempt + 1,
                            "poll fetch unusable, retrying"
                        );
                    }
                },
            }
        }

        Err(DeepWikiError::PollTimeout {
            attempts: max_attempts,
        })
    }
}

/// JSON truthiness, matching what the service's own frontend checks.
fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

fn describe_failure(outcome: &Outcome) -> String {
    match (outcome.error, outcome.status) {
        (Some(TransportFailure::Closed), _) => "transport closed".to_string(),
        (Some(TransportFailure::Http), Some(status)) => format!("HTTP {status}"),
        (Some(TransportFailure::Client), _) => "network error".to_string(),
        _ => "request failed".to_string(),
    }
}
