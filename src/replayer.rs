//! The replay engine: one connection, one sequential publish loop.
//!
//! Control flow per pass: stream rows from the CSV source, encode each as
//! JSON, hand it to the connection at QoS 1, then pace. Cancellation is
//! cooperative and observed at loop boundaries; teardown runs on every
//! exit path once a connection exists.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::mqtt::{ConnectionEvent, JsonSerializer, MqttConnection, Pacer};
use crate::source::CsvSource;
use crate::{Config, Result};

/// Counters for one replay run. Monotonically non-decreasing, mutated only
/// by the replay loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Rows published across all passes.
    pub messages_published: u64,
    /// Number of the pass in progress when the run ended (1-based).
    pub passes_started: u64,
    /// Whether the run ended because the user interrupted it.
    pub interrupted: bool,
}

pub struct Replayer {
    config: Config,
}

impl Replayer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the replay until the source is exhausted (single pass), the
    /// token is cancelled, or a failure occurs.
    ///
    /// The source is opened before any broker work, so an unreadable file
    /// never triggers a connection attempt. Once connected, the broker
    /// session is torn down exactly once whether the loop completes, is
    /// interrupted, or fails mid-stream.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<ReplaySummary> {
        let source = CsvSource::open(&self.config.source.path)?;
        info!(
            source = %source.path().display(),
            columns = source.header().len(),
            topic = %self.config.replay.topic,
            interval_secs = self.config.replay.interval_secs,
            continuous = self.config.replay.continuous,
            "starting replay"
        );

        let mut connection = MqttConnection::connect(&self.config.broker).await?;
        let mut events = connection.take_events();

        let result = self.publish_loop(&connection, &source, &mut events, &shutdown).await;

        // Teardown runs regardless of how the loop ended.
        connection.disconnect().await;

        let summary = result?;
        debug!(
            messages = summary.messages_published,
            passes = summary.passes_started,
            interrupted = summary.interrupted,
            "replay loop ended"
        );
        Ok(summary)
    }

    async fn publish_loop(
        &self,
        connection: &MqttConnection,
        source: &CsvSource,
        events: &mut Option<tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>>,
        shutdown: &CancellationToken,
    ) -> Result<ReplaySummary> {
        let pacer = Pacer::new(self.config.replay.interval());
        let topic = &self.config.replay.topic;
        let mut summary = ReplaySummary::default();

        'replay: loop {
            summary.passes_started += 1;
            if summary.passes_started > 1 {
                info!(pass = summary.passes_started, "pass complete, replaying from the first row");
            }

            for record in source.pass()? {
                if shutdown.is_cancelled() {
                    break 'replay;
                }

                let record = record?;
                let payload = JsonSerializer::serialize(&record)?;

                tokio::select! {
                    _ = shutdown.cancelled() => break 'replay,
                    submitted = connection.publish(topic, payload) => submitted?,
                }
                summary.messages_published += 1;
                debug!(
                    row = summary.messages_published,
                    pass = summary.passes_started,
                    "published row"
                );

                drain_events(events);

                tokio::select! {
                    _ = shutdown.cancelled() => break 'replay,
                    _ = pacer.tick() => {}
                }
            }

            if !self.config.replay.continuous || shutdown.is_cancelled() {
                break;
            }
        }

        summary.interrupted = shutdown.is_cancelled();
        Ok(summary)
    }
}

/// Logs whatever outcomes the background I/O task has reported so far.
/// Never waits: the publish path is independent of acknowledgment arrival.
fn drain_events(events: &mut Option<tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>>) {
    let Some(rx) = events.as_mut() else {
        return;
    };
    while let Ok(event) = rx.try_recv() {
        match event {
            ConnectionEvent::PubAck { pkid } => debug!(pkid, "publish acknowledged"),
            ConnectionEvent::Connected { session_present } => {
                debug!(session_present, "session established")
            }
            ConnectionEvent::ConnectFailed { code } => {
                warn!(code = ?code, "publishing against a rejected session")
            }
            ConnectionEvent::Disconnected => debug!("session closed by broker"),
            ConnectionEvent::TransportError { message } => {
                debug!(message = %message, "transport error reported")
            }
        }
    }
}
