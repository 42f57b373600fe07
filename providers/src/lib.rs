//! Classification backend clients.
//!
//! # Architecture
//!
//! - [`Dispatcher`] - single-flight entry point; posts one capture at a time
//! - [`BackendTarget`] - hosted endpoint or a user-supplied local model server
//! - [`ClassifierEndpoints`] - the hosted route and the local relay route
//!
//! # Wire format
//!
//! Requests are `{"imageBase64": ..., "apiUrl"?: ...}`; `apiUrl` is sent only
//! on the local path. Success bodies are `{"material": [{"part_name", "answer"}]}`.
//! Error bodies are `{"error", "details"?}` and are surfaced unchanged through
//! [`DispatchError::Api`].
//!
//! # Error Handling
//!
//! A dispatch attempted while another is outstanding returns
//! [`DispatchError::Busy`] without making a network call. Nothing is retried.

mod dispatcher;
mod target;
mod wire;

use std::time::Duration;

pub use dispatcher::{DispatchError, Dispatcher, InFlightGuard};
pub use sortcam_types;
pub use target::{
    BackendTarget, BackendTargetError, ClassifierEndpoints, DEFAULT_HOSTED_ENDPOINT,
    DEFAULT_LOCAL_RELAY_ENDPOINT, parse_http_url,
};

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// TCP keepalive idle time; interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 4;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Timeouts for the classifier HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Build the classifier client. Plain http is allowed for LAN model servers.
pub fn http_client(timeouts: ClientTimeouts) -> Result<reqwest::Client, reqwest::Error> {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        "User-Agent",
        HeaderValue::from_static(concat!("sortcam/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
        .build()
}

/// Read an error body, capped at 32 KiB.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
