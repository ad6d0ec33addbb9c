use std::fmt;

use reqwest::Url;

use crate::ClientError;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// API root of a local, unauthenticated control plane
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Where and as whom requests are sent.
///
/// Immutable once built; a connection holds one for its whole lifetime.
#[derive(Clone)]
pub struct Endpoint {
    base_url: Url,
    namespace: String,
    token: Option<String>,
}

impl Endpoint {
    pub fn new(base_url: &str, namespace: impl Into<String>) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot hold resource paths".to_string()));
        }

        Ok(Self {
            base_url: url,
            namespace: namespace.into(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build the URL of `path` under `scope`.
    ///
    /// `path` segments are percent-encoded individually, so resource names can
    /// not escape their collection.
    pub fn url(&self, scope: &Scope, path: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "url cannot hold resource paths".to_string(),
            })?;
            segments.pop_if_empty();
            if let Some(namespace) = scope.namespace(self) {
                segments.push("namespaces").push(namespace);
            }
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url.as_str())
            .field("namespace", &self.namespace)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which namespace segment, if any, a request path is placed under
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// The endpoint's configured namespace
    #[default]
    Namespaced,
    /// An explicit namespace for this call only
    Namespace(String),
    /// No namespace segment, for cluster-scoped resources such as namespaces
    Cluster,
}

impl Scope {
    fn namespace<'a>(&'a self, endpoint: &'a Endpoint) -> Option<&'a str> {
        match self {
            Self::Namespaced => Some(endpoint.namespace()),
            Self::Namespace(namespace) => Some(namespace),
            Self::Cluster => None,
        }
    }
}
