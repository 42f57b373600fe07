//! Backend targets and endpoint configuration.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Default hosted classification route.
pub const DEFAULT_HOSTED_ENDPOINT: &str = "http://localhost:3000/api/classify";
/// Default relay route that forwards to a user-supplied local model server.
pub const DEFAULT_LOCAL_RELAY_ENDPOINT: &str = "http://localhost:3000/api/classify/local";

#[derive(Debug, Error)]
pub enum BackendTargetError {
    #[error("local API URL must not be empty")]
    Empty,
    #[error("invalid URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
}

/// Where the next classification request goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendTarget {
    /// Fixed hosted endpoint; no user-supplied address.
    #[default]
    Hosted,
    /// User-configured model server, reached through the local relay.
    Local(Url),
}

impl BackendTarget {
    /// Validate a user-supplied local model URL.
    pub fn local(raw: &str) -> Result<Self, BackendTargetError> {
        parse_http_url(raw).map(BackendTarget::Local)
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, BackendTarget::Local(_))
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            BackendTarget::Hosted => "hosted",
            BackendTarget::Local(_) => "local",
        }
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendTarget::Hosted => f.write_str("hosted"),
            BackendTarget::Local(url) => write!(f, "local ({url})"),
        }
    }
}

/// Parse an absolute http(s) URL, rejecting blanks and other schemes.
pub fn parse_http_url(raw: &str) -> Result<Url, BackendTargetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BackendTargetError::Empty);
    }
    let url = Url::parse(trimmed).map_err(|source| BackendTargetError::Invalid {
        url: trimmed.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(BackendTargetError::UnsupportedScheme(other.to_string())),
    }
}

/// The two routes the dispatcher posts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierEndpoints {
    hosted: Url,
    local_relay: Url,
}

impl ClassifierEndpoints {
    #[must_use]
    pub fn new(hosted: Url, local_relay: Url) -> Self {
        Self {
            hosted,
            local_relay,
        }
    }

    #[must_use]
    pub fn hosted(&self) -> &Url {
        &self.hosted
    }

    #[must_use]
    pub fn local_relay(&self) -> &Url {
        &self.local_relay
    }

    #[must_use]
    pub fn route_for(&self, target: &BackendTarget) -> &Url {
        match target {
            BackendTarget::Hosted => &self.hosted,
            BackendTarget::Local(_) => &self.local_relay,
        }
    }
}
