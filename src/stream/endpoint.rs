//! Stream endpoint construction and auth context.

use crate::model::StreamError;
use url::Url;

/// A fully-resolved stream endpoint.
///
/// Built from the base HTTP(S) URL of the container logs resource, with the
/// scheme rewritten to its streaming equivalent (secure HTTP → secure
/// streaming, plain HTTP → plain streaming) and the stream options attached
/// as query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    url: Url,
    tail: TailDepth,
    timestamps: bool,
}

/// Requested server-side history depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDepth {
    /// Request the last `n` lines of history before live frames.
    Lines(u32),
    /// Request the entire retained history.
    All,
}

impl std::fmt::Display for TailDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TailDepth::Lines(n) => write!(f, "{n}"),
            TailDepth::All => write!(f, "all"),
        }
    }
}

impl StreamEndpoint {
    /// Build an endpoint from a base HTTP(S) URL.
    ///
    /// The path of `base` identifies the container/environment resource; it
    /// is kept as-is. `https` is rewritten to `wss` and `http` to `ws`; any
    /// other scheme is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidEndpoint`] if `base` does not parse as a
    /// URL or carries a non-HTTP scheme.
    pub fn from_http_base(
        base: &str,
        tail: TailDepth,
        timestamps: bool,
    ) -> Result<Self, StreamError> {
        let mut url = Url::parse(base).map_err(|e| StreamError::InvalidEndpoint {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(StreamError::InvalidEndpoint {
                    url: base.to_string(),
                    reason: format!("unsupported scheme '{other}' (expected http or https)"),
                });
            }
        };
        // set_scheme only fails for special-scheme/host incompatibilities
        // that cannot arise on an http(s) source URL.
        url.set_scheme(scheme)
            .map_err(|()| StreamError::InvalidEndpoint {
                url: base.to_string(),
                reason: "scheme rewrite failed".to_string(),
            })?;

        // The query carries exactly the stream options; anything on the
        // base URL is replaced.
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("tail", &tail.to_string())
            .append_pair("timestamps", if timestamps { "true" } else { "false" });

        Ok(Self {
            url,
            tail,
            timestamps,
        })
    }

    /// The rewritten streaming URL, query parameters included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Requested history depth.
    pub fn tail(&self) -> TailDepth {
        self.tail
    }

    /// Whether server-side timestamp annotation was requested.
    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    /// The same endpoint with `timestamps` flipped.
    ///
    /// Used by the viewer's timestamps toggle, which recreates the
    /// connection: the returned endpoint is handed to a fresh
    /// [`StreamConnection`](crate::stream::StreamConnection).
    pub fn with_timestamps(&self, timestamps: bool) -> Self {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("tail", &self.tail.to_string())
            .append_pair("timestamps", if timestamps { "true" } else { "false" });
        Self {
            url,
            tail: self.tail,
            timestamps,
        }
    }
}

/// How the connection authenticates.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Bearer token applied as an `Authorization` header on the upgrade
    /// request. Used by the headless consumer.
    Bearer(String),
    /// Credential already established by the surrounding session; no header
    /// is constructed. Used by the interactive viewer.
    Ambient,
}
