//! A client for pushing time-series metrics to an [OpenTSDB][opentsdb]-compatible HTTP endpoint.
//!
//! [opentsdb]: http://opentsdb.net/docs/build/html/api_http/put.html
//!
//! # Usage
//!
//! ```no_run
//! # use opentsdb_client::{Client, Metric};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // First, create a builder pointed at the base URL of the endpoint.
//! //
//! // The builder can also configure HTTP Basic authentication and the batch size, which controls how
//! // many metrics are buffered before they're sent.
//! let mut client = Client::builder("http://127.0.0.1:4242")?
//!     .with_auth("tsdb", "secret")?
//!     .with_batch_size(50)?
//!     .build()?;
//!
//! // Metrics can be buffered, in which case they're sent in batches once enough have been collected...
//! let metric = Metric::new(1_700_000_000, "sys.cpu.user", 42.5).with_tag("host", "web01");
//! client.enqueue(metric)?;
//!
//! // ...or sent immediately, on their own.
//! let metric = Metric::new(1_700_000_000, "sys.mem.free", 1024).with_tag("host", "web01");
//! client.send(&metric)?;
//!
//! // Whatever is still buffered can be sent at any time, and must be sent before shutting down.
//! client.push()?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Behavior
//!
//! ## Buffering
//!
//! Buffered metrics are sent once the buffer holds as many metrics as the configured batch size, when
//! [`Client::push`] is called, or when the client is closed with [`Client::close`]. Metrics are sent
//! in the order they were buffered. There is no background flushing: nothing is sent unless one of
//! these calls is made, and metrics still buffered when the client is dropped are lost.
//!
//! ## Failures
//!
//! Every request is attempted exactly once. When a flush fails, the buffered metrics are discarded
//! and the error is returned to the caller of the operation that triggered the flush.
//!
//! Responses with a status code of 400 or above are reported as [`SendError::Server`], carrying the
//! status line and response body. Failures to encode the payload or to get a response at all are
//! reported as [`SendError::Transport`].
//!
//! ## Threading
//!
//! All operations block until the request completes. The client does no internal synchronization.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, ClientBuilder};

mod client;
pub use self::client::{Client, SendError};

mod metric;
pub use self::metric::{Metric, Value};

mod transport;
pub use self::transport::{HyperTransport, Transport, TransportError};
