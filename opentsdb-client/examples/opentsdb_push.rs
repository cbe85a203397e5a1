//! Pushes a handful of metrics to an OpenTSDB endpoint at `http://127.0.0.1:4242`, or at the base
//! URL given as the first argument.
use std::time::{SystemTime, UNIX_EPOCH};

use opentsdb_client::Client;
use opentsdb_client::Metric;
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let base_url = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:4242".to_string());

    let mut client = Client::builder(&base_url)
        .and_then(|builder| builder.with_batch_size(4))
        .and_then(|builder| builder.build())
        .expect("failed to build OpenTSDB client");

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .expect("system clock is before the Unix epoch");

    // Ten metrics with a batch size of four: two full batches are sent as they fill up, and the
    // remaining two are sent when the client is closed.
    for i in 0..10 {
        let metric = Metric::new(now + i, "example.loop.iteration", i)
            .with_tag("host", "localhost")
            .with_tag("parity", if i % 2 == 0 { "even" } else { "odd" });

        if let Err(e) = client.enqueue(metric) {
            error!(error = %e, "Failed to enqueue metric.");
        }
    }

    let heartbeat = Metric::new(now, "example.heartbeat", 1).with_tags([("host", "localhost")]);
    match client.send(&heartbeat) {
        Ok(()) => info!("Sent heartbeat."),
        Err(e) => error!(error = %e, "Failed to send heartbeat."),
    }

    if let Err(e) = client.close() {
        error!(error = %e, "Failed to send remaining metrics.");
    }
}
