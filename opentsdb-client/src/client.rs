use std::mem;

use bytes::Bytes;
use hyper::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method, Request, Response, StatusCode, Uri,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    builder::{BuildError, ClientBuilder},
    metric::Metric,
    transport::{Transport, TransportError},
};

/// Errors that could occur while sending metrics.
#[derive(Debug, Error)]
pub enum SendError {
    /// The metric was rejected before sending because its tags were never set.
    #[error("tags can not be empty for metric '{metric}'")]
    MissingTags {
        /// Name of the rejected metric.
        metric: String,
    },

    /// No response was received from the endpoint.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The endpoint responded with an error status.
    #[error("{status}: {body}")]
    Server {
        /// Status line of the response, such as `500 Internal Server Error`.
        status: String,

        /// Body of the response.
        body: String,
    },
}

/// A client for an OpenTSDB-compatible `/api/put` endpoint.
///
/// Metrics can either be sent immediately, one per request, with [`send`][Client::send], or
/// buffered with [`enqueue`][Client::enqueue] and sent in batches. The buffer is flushed whenever it
/// reaches the configured batch size, when [`push`][Client::push] is called, and when the client is
/// shut down with [`close`][Client::close].
///
/// A flush always empties the buffer, whether or not the request succeeded. Metrics from a failed
/// flush are dropped and the error is returned to the caller.
///
/// All operations block the calling thread until the request has completed. The client does no
/// internal synchronization, so sharing it across threads requires external locking.
pub struct Client<T = crate::HyperTransport> {
    endpoint: Uri,
    auth: Option<HeaderValue>,
    batch_size: usize,
    buffer: Vec<Metric>,
    transport: T,
}

impl Client {
    /// Creates a [`ClientBuilder`] targeting the given base URL.
    ///
    /// # Errors
    ///
    /// If the base URL cannot be turned into a valid endpoint, an error variant will be returned.
    pub fn builder<U>(base_url: U) -> Result<ClientBuilder, BuildError>
    where
        U: AsRef<str>,
    {
        ClientBuilder::new(base_url)
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    pub(crate) fn new(
        endpoint: Uri,
        auth: Option<HeaderValue>,
        batch_size: usize,
        transport: T,
    ) -> Self {
        Self { endpoint, auth, batch_size, buffer: Vec::with_capacity(batch_size), transport }
    }

    /// Adds a metric to the buffer.
    ///
    /// If the buffer reaches the configured batch size, all buffered metrics are sent in a single
    /// request and the buffer is emptied.
    ///
    /// # Errors
    ///
    /// If the tags of `metric` were never set, it is rejected and the buffer is left untouched.
    /// Otherwise, if this call triggered a flush and the flush failed, the error is returned. The
    /// buffer is empty afterwards either way.
    pub fn enqueue(&mut self, metric: Metric) -> Result<(), SendError> {
        ensure_tags(&metric)?;

        self.buffer.push(metric);
        if self.buffer.len() >= self.batch_size {
            let batch = self.take_buffer();
            debug!(count = batch.len(), "Buffer reached batch size, flushing.");
            self.transmit(&batch)?;
        }

        Ok(())
    }

    /// Sends a single metric immediately, bypassing the buffer.
    ///
    /// # Errors
    ///
    /// If the tags of `metric` were never set, or the request fails, an error variant will be
    /// returned describing the failure.
    pub fn send(&self, metric: &Metric) -> Result<(), SendError> {
        ensure_tags(metric)?;
        self.transmit(std::slice::from_ref(metric))
    }

    /// Sends all buffered metrics and empties the buffer.
    ///
    /// Does nothing if the buffer is empty.
    ///
    /// # Errors
    ///
    /// If the request fails, an error variant will be returned describing the failure. The buffered
    /// metrics are discarded regardless.
    pub fn push(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let batch = self.take_buffer();
        debug!(count = batch.len(), "Pushing buffered metrics.");
        self.transmit(&batch)
    }

    /// Sends all buffered metrics and shuts down the client.
    ///
    /// Unlike [`push`][Client::push], a request is made even if the buffer is empty.
    ///
    /// Buffered metrics are never sent implicitly, so this should be the last call made before the
    /// client is dropped.
    ///
    /// # Errors
    ///
    /// If the request fails, an error variant will be returned describing the failure.
    pub fn close(mut self) -> Result<(), SendError> {
        let batch = self.take_buffer();
        debug!(count = batch.len(), "Closing client, sending remaining metrics.");
        self.transmit(&batch)
    }

    /// Number of metrics currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no metrics are currently buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Metrics currently buffered, in the order they were enqueued.
    pub fn buffered(&self) -> &[Metric] {
        &self.buffer
    }

    /// Number of buffered metrics that triggers a flush.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Full URI that metrics are sent to.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn take_buffer(&mut self) -> Vec<Metric> {
        mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size))
    }

    fn transmit(&self, metrics: &[Metric]) -> Result<(), SendError> {
        let body = serde_json::to_vec(metrics).map_err(TransportError::from)?;

        let mut builder = Request::builder()
            .method(Method::PUT)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(auth) = &self.auth {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        let request = builder.body(Bytes::from(body)).map_err(TransportError::from)?;

        let response = self.transport.execute(request)?;
        check_status(&response)
    }
}

fn ensure_tags(metric: &Metric) -> Result<(), SendError> {
    if metric.has_tags() {
        Ok(())
    } else {
        Err(SendError::MissingTags { metric: metric.name().to_string() })
    }
}

fn check_status(response: &Response<Bytes>) -> Result<(), SendError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(());
    }

    let body = String::from_utf8_lossy(response.body()).into_owned();
    debug!(status = status.as_u16(), %body, "Endpoint rejected metrics.");

    Err(SendError::Server { status: status_line(status), body })
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_str(), reason),
        None => status.as_str().to_string(),
    }
}
