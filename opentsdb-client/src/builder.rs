use hyper::{header::HeaderValue, Uri};
use thiserror::Error;

use crate::{
    client::Client,
    transport::{basic_auth, HyperTransport, Transport},
};

const DEFAULT_BATCH_SIZE: usize = 20;
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 1024;
const PUT_PATH: &str = "/api/put";

/// Errors that could occur while building a [`Client`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// The base URL could not be turned into a valid endpoint.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint {
        /// Details about the parsing failure.
        reason: String,
    },

    /// The batch size was outside of the allowed range.
    #[error("batch size should be between 1 and 1024, got {size}")]
    InvalidBatchSize {
        /// The rejected batch size.
        size: usize,
    },

    /// The credentials could not be encoded as an `Authorization` header.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials {
        /// Details about the encoding failure.
        reason: String,
    },

    /// Failed to create the runtime used to drive requests.
    #[error("failed to create runtime for transport: {0}")]
    FailedToCreateRuntime(String),
}

/// Builder for creating a [`Client`].
///
/// Settings are applied in the order they are called, with later calls replacing the effect of
/// earlier ones. Every fallible setter validates its input immediately, so a chain of setters
/// stops at the first invalid value.
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: Uri,
    auth: Option<HeaderValue>,
    batch_size: usize,
}

impl ClientBuilder {
    /// Creates a new [`ClientBuilder`] targeting the given base URL.
    ///
    /// Metrics are sent to the `/api/put` path under `base_url`, so a base URL of
    /// `http://tsdb.local:4242` results in requests to `http://tsdb.local:4242/api/put`.
    ///
    /// # Errors
    ///
    /// If the resulting endpoint cannot be parsed into a valid URI, or is missing a scheme or host, an
    /// error variant will be returned describing the error.
    pub fn new<T>(base_url: T) -> Result<Self, BuildError>
    where
        T: AsRef<str>,
    {
        let base_url = base_url.as_ref().trim_end_matches('/');
        let endpoint = Uri::try_from(format!("{base_url}{PUT_PATH}"))
            .map_err(|e| BuildError::InvalidEndpoint { reason: e.to_string() })?;

        if endpoint.scheme().is_none() || endpoint.authority().is_none() {
            return Err(BuildError::InvalidEndpoint {
                reason: format!("'{base_url}' is missing a scheme or host"),
            });
        }

        Ok(Self { endpoint, auth: None, batch_size: DEFAULT_BATCH_SIZE })
    }

    /// Sets the credentials to use for HTTP Basic authentication.
    ///
    /// An empty `username` disables authentication, which is also the default.
    ///
    /// # Errors
    ///
    /// If the credentials cannot be encoded into a header value, an error variant will be returned.
    pub fn with_auth<U, P>(mut self, username: U, password: P) -> Result<Self, BuildError>
    where
        U: AsRef<str>,
        P: AsRef<str>,
    {
        let username = username.as_ref();
        self.auth = if username.is_empty() {
            None
        } else {
            let header = basic_auth(username, password.as_ref())
                .map_err(|e| BuildError::InvalidCredentials { reason: e.to_string() })?;
            Some(header)
        };

        Ok(self)
    }

    /// Sets the number of buffered metrics that triggers a flush.
    ///
    /// When [`Client::enqueue`] brings the buffer up to this many metrics, the whole buffer is sent
    /// in a single request.
    ///
    /// Defaults to 20.
    ///
    /// # Errors
    ///
    /// If `batch_size` is not between 1 and 1024, inclusive, an error variant will be returned.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, BuildError> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(BuildError::InvalidBatchSize { size: batch_size });
        }

        self.batch_size = batch_size;
        Ok(self)
    }

    /// Builds the client, using the default [`HyperTransport`].
    ///
    /// # Errors
    ///
    /// If the transport cannot be created, an error variant will be returned describing the error.
    pub fn build(self) -> Result<Client<HyperTransport>, BuildError> {
        let transport = HyperTransport::new()?;
        Ok(self.build_with_transport(transport))
    }

    /// Builds the client, sending requests through the given transport.
    pub fn build_with_transport<T>(self, transport: T) -> Client<T>
    where
        T: Transport,
    {
        Client::new(self.endpoint, self.auth, self.batch_size, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildError, ClientBuilder, DEFAULT_BATCH_SIZE};

    const BASE_URL: &str = "http://127.0.0.1:4242";

    #[test]
    fn test_defaults() {
        let builder = ClientBuilder::new(BASE_URL).unwrap();
        assert_eq!(builder.endpoint, "http://127.0.0.1:4242/api/put");
        assert_eq!(builder.batch_size, DEFAULT_BATCH_SIZE);
        assert!(builder.auth.is_none());
    }

    #[test]
    fn test_endpoint() {
        let builder = ClientBuilder::new("https://tsdb.example.com/").unwrap();
        assert_eq!(builder.endpoint, "https://tsdb.example.com/api/put");

        let builder = ClientBuilder::new("http://tsdb.example.com/prefix").unwrap();
        assert_eq!(builder.endpoint, "http://tsdb.example.com/prefix/api/put");

        for invalid in ["", "not a url", "/just/a/path", "http://bad host:4242"] {
            let result = ClientBuilder::new(invalid);
            assert!(
                matches!(result, Err(BuildError::InvalidEndpoint { .. })),
                "expected '{invalid}' to be rejected"
            );
        }
    }

    #[test]
    fn test_batch_size_bounds() {
        for size in [0, 1025, usize::MAX] {
            let result = ClientBuilder::new(BASE_URL).unwrap().with_batch_size(size);
            match result {
                Err(BuildError::InvalidBatchSize { size: rejected }) => assert_eq!(rejected, size),
                other => panic!("expected batch size {size} to be rejected, got {other:?}"),
            }
        }

        for size in [1, 20, 1024] {
            let builder = ClientBuilder::new(BASE_URL).unwrap().with_batch_size(size).unwrap();
            assert_eq!(builder.batch_size, size);
        }
    }

    #[test]
    fn test_later_settings_win() {
        let builder = ClientBuilder::new(BASE_URL)
            .unwrap()
            .with_batch_size(5)
            .unwrap()
            .with_auth("tsdb", "secret")
            .unwrap()
            .with_batch_size(7)
            .unwrap()
            .with_auth("", "ignored")
            .unwrap();

        assert_eq!(builder.batch_size, 7);
        assert!(builder.auth.is_none());
    }

    #[test]
    fn test_first_invalid_setting_aborts() {
        let result = ClientBuilder::new(BASE_URL)
            .and_then(|b| b.with_batch_size(0))
            .and_then(|b| b.with_batch_size(10));

        assert!(matches!(result, Err(BuildError::InvalidBatchSize { size: 0 })));
    }

    #[test]
    fn test_auth_header() {
        let builder = ClientBuilder::new(BASE_URL).unwrap().with_auth("tsdb", "secret").unwrap();
        let header = builder.auth.expect("auth should be set");
        assert_eq!(header, "Basic dHNkYjpzZWNyZXQ=");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_build_error_messages() {
        let err = ClientBuilder::new(BASE_URL).unwrap().with_batch_size(1025).unwrap_err();
        assert_eq!(err.to_string(), "batch size should be between 1 and 1024, got 1025");
    }
}
