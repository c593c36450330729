use std::env;
use std::time::Duration;

/// What to do when a poll fetch fails at the transport level or comes back
/// without a usable `queries` list. The upstream's error state for a given
/// query id is permanent, so `Fatal` is the safe default; `Retry` spends one
/// attempt from the budget and keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollErrorPolicy {
    #[default]
    Fatal,
    Retry,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Query endpoint. POST here to submit, GET `{base_url}/{query_id}` to poll.
    pub base_url: String,
    /// Sleep between consecutive poll attempts (none before the first).
    pub poll_interval: Duration,
    /// Poll budget. The query fails with a timeout once this many fetches
    /// have all come back pending.
    pub max_poll_attempts: u32,
    pub poll_error_policy: PollErrorPolicy,
}

pub const DEFAULT_BASE_URL: &str = "https://api.devin.ai/ada/query";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 50;

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            poll_error_policy: PollErrorPolicy::default(),
        }
    }
}

impl Config {
    /// Build from `DEEPWIKI_*` environment variables. Unset or unparseable
    /// values fall back to the defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    // Parsing is separated from the env read so it can be tested without
    // mutating process-wide state.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(url) = get("DEEPWIKI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(secs) =
            parse_value::<u64>("DEEPWIKI_POLL_INTERVAL_SECS", get("DEEPWIKI_POLL_INTERVAL_SECS"))
        {
            if secs > 0 {
                config.poll_interval = Duration::from_secs(secs);
            } else {
                tracing::warn!("DEEPWIKI_POLL_INTERVAL_SECS must be > 0, using default");
            }
        }

        if let Some(attempts) =
            parse_value::<u32>("DEEPWIKI_MAX_POLL_ATTEMPTS", get("DEEPWIKI_MAX_POLL_ATTEMPTS"))
        {
            if attempts > 0 {
                config.max_poll_attempts = attempts;
            } else {
                tracing::warn!("DEEPWIKI_MAX_POLL_ATTEMPTS must be > 0, using default");
            }
        }

        if let Some(retry) =
            parse_value::<bool>("DEEPWIKI_RETRY_POLL_ERRORS", get("DEEPWIKI_RETRY_POLL_ERRORS"))
        {
            config.poll_error_policy = if retry {
                PollErrorPolicy::Retry
            } else {
                PollErrorPolicy::Fatal
            };
        }

        config
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{name}={raw} is not valid, using default");
            None
        }
    }
}
