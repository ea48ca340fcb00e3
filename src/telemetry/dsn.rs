use thiserror::Error;
use url::Url;

/// Substrings that identify a copied example value rather than a real DSN.
const PLACEHOLDER_MARKERS: [&str; 2] = ["example", "123456"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DsnError {
    #[error("invalid DSN URL: {0}")]
    InvalidUrl(String),
    #[error("DSN has no public key")]
    MissingKey,
    #[error("DSN has no project id")]
    MissingProject,
    #[error("DSN has no host")]
    MissingHost,
}

/// Parsed `scheme://<public_key>@<host>[:port]/<project_id>` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    scheme: String,
    public_key: String,
    host: String,
    port: Option<u16>,
    project_id: String,
}

impl Dsn {
    pub fn parse(raw: &str) -> Result<Self, DsnError> {
        let url = Url::parse(raw.trim()).map_err(|err| DsnError::InvalidUrl(err.to_string()))?;
        let public_key = url.username();
        if public_key.is_empty() {
            return Err(DsnError::MissingKey);
        }
        let host = url.host_str().ok_or(DsnError::MissingHost)?;
        let project_id = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .ok_or(DsnError::MissingProject)?;

        Ok(Self {
            scheme: url.scheme().to_owned(),
            public_key: public_key.to_owned(),
            host: host.to_owned(),
            port: url.port(),
            project_id: project_id.to_owned(),
        })
    }

    #[inline]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    #[inline]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Endpoint events are posted to.
    pub fn store_url(&self) -> String {
        match self.port {
            Some(port) => format!(
                "{}://{}:{}/api/{}/store/",
                self.scheme, self.host, port, self.project_id
            ),
            None => format!("{}://{}/api/{}/store/", self.scheme, self.host, self.project_id),
        }
    }

    /// Value of the authentication header sent with every event.
    pub fn auth_header(&self, client: &str) -> String {
        format!("Sentry sentry_version=7, sentry_key={}, sentry_client={client}", self.public_key)
    }
}

/// Whether a configured DSN should be treated as absent.
pub fn is_placeholder(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || PLACEHOLDER_MARKERS.iter().any(|marker| raw.contains(marker))
}
