use std::thread;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;

use crate::error::FetchError;

/// Something that can GET a URL and hand back the body.
///
/// The batch fetcher only talks to the network through this trait, so
/// tests can swap in a canned transport.
pub trait Transport {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Connection-level retry policy.
///
/// Only failures to connect are retried. A server that answers, even with
/// an error status, is taken at its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_retries: u32,
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            connect_retries: 3,
            backoff_factor: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `retry`-th retry (1-based): factor * 2^(retry - 1).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let shift = (retry - 1).min(16);
        self.backoff_factor * (1u32 << shift)
    }
}

/// A pooled blocking client plus the retry policy, shared by every comic
/// in a run.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    policy: RetryPolicy,
}

impl HttpSession {
    pub fn new(policy: RetryPolicy) -> HttpSession {
        HttpSession {
            client: Client::new(),
            policy,
        }
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let mut retry = 0;
        loop {
            match self.client.get(url).send() {
                Ok(response) => return Ok(response),
                Err(err) if err.is_connect() && retry < self.policy.connect_retries => {
                    retry += 1;
                    let delay = self.policy.backoff(retry);
                    warn!(
                        "Could not connect to {} ({}), retry {}/{} in {:?}",
                        url, err, retry, self.policy.connect_retries, delay
                    );
                    thread::sleep(delay);
                }
                Err(source) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        attempts: retry + 1,
                        source,
                    })
                }
            }
        }
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        HttpSession::new(RetryPolicy::default())
    }
}

impl Transport for HttpSession {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", url);
        let response = self.send(url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            attempts: 1,
            source,
        })?;
        Ok(body.to_vec())
    }
}
