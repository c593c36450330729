use serde::Deserialize;

/// Poll body shape: `{"queries": [{"state", "response": [events]}]}`.
/// Only the documented fields are modeled; anything else is ignored during
/// deserialization, and a body that does not match at all is classified as
/// unusable rather than carried forward as an untyped map.
#[derive(Debug, Deserialize)]
pub struct PollSnapshot {
    #[serde(default)]
    pub queries: Vec<QueryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRecord {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub response: Option<Vec<ResponseEvent>>,
}

/// One event in the incremental response log.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseEvent {
    /// A fragment of the answer text.
    Chunk {
        #[serde(default)]
        data: String,
    },
    /// Terminal marker; no further chunks follow in this snapshot.
    Done,
    #[serde(other)]
    Other,
}

/// What one poll fetch told us about the query.
#[derive(Debug, PartialEq)]
pub enum PollState {
    /// Answer not finished yet; poll again after the interval.
    Pending,
    /// Body missing, malformed, or without a non-empty `queries` list.
    /// Whether this aborts the query or spends a retry is policy.
    Unusable,
    /// The service marked the query errored. Permanent for this id.
    Errored,
    /// Finished; carries the assembled answer text.
    Done(String),
}

/// Classify the parsed body of one poll fetch.
///
/// Only the last `queries` entry is inspected; the service appends and the
/// latest entry is authoritative. Each fetch returns the complete log, so no
/// state is accumulated across polls.
pub fn classify(data: Option<serde_json::Value>) -> PollState {
    let Some(value) = data else {
        return PollState::Unusable;
    };

    let snapshot: PollSnapshot = match serde_json::from_value(value) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!("poll body does not match schema: {e}");
            return PollState::Unusable;
        }
    };

    let Some(last) = snapshot.queries.last() else {
        return PollState::Unusable;
    };

    if last.state.as_deref() == Some("error") {
        return PollState::Errored;
    }

    // An absent or empty log means the engine has not started answering.
    let Some(events) = last.response.as_deref().filter(|r| !r.is_empty()) else {
        return PollState::Pending;
    };

    match events.last() {
        Some(ResponseEvent::Done) => PollState::Done(assemble(events)),
        _ => PollState::Pending,
    }
}

/// Concatenate every chunk fragment in log order. Non-chunk events are
/// skipped; fragments are never reordered or deduplicated.
fn assemble(events: &[ResponseEvent]) -> String {
    let mut text = String::new();
    for event in events {
        if let ResponseEvent::Chunk { data } = event {
            text.push_str(data);
        }
    }
    text
}
