//! HTTP boundary used by scrape strategies.
//!
//! Strategies only see [`HttpFetcher`]; the production implementation is a
//! blocking `ureq` agent with a browser-like user agent and a request timeout.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

pub trait HttpFetcher {
    /// GET `url` and return the response body for a 2xx status.
    fn get(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

impl HttpFetcher for UreqFetcher {
    fn get(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "GET");
        match self.agent.request_url("GET", url).call() {
            Ok(response) => response
                .into_string()
                .map_err(|e| classify_io(url, &e)),
            Err(ureq::Error::Status(status, _)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => {
                let timed_out = std::error::Error::source(&transport)
                    .and_then(|s| s.downcast_ref::<io::Error>())
                    .is_some_and(is_timeout_kind);
                if timed_out {
                    Err(FetchError::Timeout {
                        url: url.to_string(),
                    })
                } else {
                    Err(FetchError::Transport {
                        url: url.to_string(),
                        message: transport.to_string(),
                    })
                }
            }
        }
    }
}

fn is_timeout_kind(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn classify_io(url: &Url, err: &io::Error) -> FetchError {
    if is_timeout_kind(err) {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
