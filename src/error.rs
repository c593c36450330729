use thiserror::Error;

/// Terminal failures of a single query lifecycle. Transport-level problems
/// (connection failures, non-2xx statuses, unparseable 2xx bodies) are
/// normalized inside [`crate::transport::Outcome`] and never surface here
/// directly; they show up as `SubmitFailed` or `ResponseError` depending on
/// which phase observed them.
#[derive(Debug, Error)]
pub enum DeepWikiError {
    #[error("submit failed: {message}")]
    SubmitFailed { message: String },

    #[error("service reported an error for query {query_id}")]
    ResponseError { query_id: String },

    #[error("query still pending after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },
}

impl DeepWikiError {
    /// Short reason string safe to show to a chat user. Does not leak
    /// upstream URLs or response bodies.
    pub fn user_message(&self) -> String {
        match self {
            Self::SubmitFailed { .. } => "failed to submit the query".to_string(),
            Self::ResponseError { .. } => {
                "the service could not answer this query".to_string()
            }
            Self::PollTimeout { attempts } => {
                format!("no answer after {attempts} status checks — try again later")
            }
        }
    }
}
