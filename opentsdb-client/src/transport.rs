use base64::{prelude::BASE64_STANDARD, Engine as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    header::{HeaderValue, InvalidHeaderValue},
    Request, Response,
};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::runtime::{self, Runtime};
use tracing::trace;

use crate::builder::BuildError;

/// Errors that could occur before a response was received from the endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The outgoing payload could not be encoded as JSON.
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] serde_json::Error),

    /// The request could not be constructed.
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    /// The request could not be sent, or no response was received.
    #[error("error sending request: {0}")]
    Send(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),
}

/// A blocking HTTP transport.
///
/// Executes a single request and returns the complete response, or an error if no response could
/// be obtained. Implementations must not interpret the response status: a response with an error
/// status is still a successful round trip as far as the transport is concerned.
pub trait Transport {
    /// Executes `request`, blocking until the full response has been received.
    ///
    /// # Errors
    ///
    /// If the request cannot be sent, or the response cannot be read in full, an error variant will
    /// be returned describing the failure.
    fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

/// The default [`Transport`], backed by `hyper`.
///
/// A dedicated single-threaded Tokio runtime drives each request to completion on the calling
/// thread. Both `http` and `https` endpoints are supported. Idle connections are not kept around,
/// so every request opens a fresh connection.
///
/// ## Panics
///
/// As requests are driven by blocking on an internal runtime, [`execute`][Transport::execute] will
/// panic if called from within an asynchronous execution context.
pub struct HyperTransport {
    runtime: Runtime,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperTransport {
    /// Creates a new [`HyperTransport`].
    ///
    /// # Errors
    ///
    /// If the internal runtime cannot be created, an error variant will be returned.
    pub fn new() -> Result<Self, BuildError> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BuildError::FailedToCreateRuntime(e.to_string()))?;

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let client = {
            let _g = runtime.enter();
            Client::builder(TokioExecutor::new()).pool_max_idle_per_host(0).build(https)
        };

        Ok(Self { runtime, client })
    }
}

impl Transport for HyperTransport {
    fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        trace!(method = %request.method(), uri = %request.uri(), "Executing request.");

        self.runtime.block_on(async {
            let response = self
                .client
                .request(request.map(Full::new))
                .await
                .map_err(|e| TransportError::Send(Box::new(e)))?;

            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();

            Ok::<_, TransportError>(Response::from_parts(parts, body))
        })
    }
}

/// Encodes `username` and `password` into an HTTP Basic `Authorization` header value.
pub(crate) fn basic_auth(username: &str, password: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut encoded = String::from("Basic ");
    BASE64_STANDARD.encode_string(format!("{username}:{password}"), &mut encoded);

    let mut header = HeaderValue::from_str(&encoded)?;
    header.set_sensitive(true);
    Ok(header)
}

#[cfg(test)]
mockall::mock! {
    pub Transport {}

    impl Transport for Transport {
        fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
    }
}
