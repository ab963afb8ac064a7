//! # Event Poller
//!
//! Drives the bounded-window polling loop for one event signature.
//!
//! ## Cycle
//!
//! ```text
//! latest = head()
//! for [from, to] in windows(watermark, latest, WINDOW):
//!     logs = get_logs(from, to, contract, topic)     // error: abort cycle
//!     for log in sort(logs):
//!         decode -> forward                           // decode error: skip
//!     watermark = to                                  // only after forwarding
//! sleep(interval)
//! ```

use rc_telemetry::{
    log_window_event, HistogramTimer, DECODE_FAILURES, EVENTS_FORWARDED, LOGS_FETCHED,
    LOG_QUERY_DURATION, POLL_CYCLE_FAILURES, WATERMARK,
};
use shared_bus::EventSignature;
use shared_types::{Address, BlockNumber, LogQuery, LogRecord};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::algorithms::{decode_log, windows};
use crate::config::PollerConfig;
use crate::domain::{CycleReport, SyncError, Watermark};
use crate::ports::{EventSink, LogSource};

const SUBSYSTEM: &str = "event-sync";

/// Polls one event signature of one contract.
pub struct EventPoller<S: LogSource + ?Sized> {
    /// Ledger read side.
    source: Arc<S>,
    /// Contract whose logs are polled.
    contract: Address,
    /// The one event this loop polls for.
    signature: EventSignature,
    /// Configuration.
    config: PollerConfig,
    /// Last block fully forwarded.
    watermark: Watermark,
}

impl<S: LogSource + ?Sized> EventPoller<S> {
    /// Create a poller. Fails on invalid configuration.
    pub fn new(
        source: Arc<S>,
        contract: Address,
        signature: EventSignature,
        config: PollerConfig,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        let watermark = config.from_block.map_or_else(Watermark::unset, Watermark::at);
        Ok(Self {
            source,
            contract,
            signature,
            config,
            watermark,
        })
    }

    /// Create a poller for an event given by name.
    ///
    /// Unrecognized names fail here, before any polling starts.
    pub fn for_event(
        source: Arc<S>,
        contract: Address,
        event: &str,
        config: PollerConfig,
    ) -> Result<Self, SyncError> {
        let signature: EventSignature = event.parse()?;
        Self::new(source, contract, signature, config)
    }

    pub fn signature(&self) -> EventSignature {
        self.signature
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Last block fully forwarded, if initialized.
    pub fn watermark(&self) -> Option<BlockNumber> {
        self.watermark.get()
    }

    /// Treat `block` and everything before it as processed.
    pub fn resume_after(&mut self, block: BlockNumber) {
        self.watermark.reset(block);
        self.publish_watermark();
    }

    /// Run one cycle: catch up from the watermark to the current head.
    ///
    /// On a ledger error the cycle stops where it is. Windows that were fully
    /// forwarded before the error keep their progress; the failed window is
    /// retried next cycle.
    pub async fn poll_cycle<K>(&mut self, sink: &mut K) -> Result<CycleReport, SyncError>
    where
        K: EventSink + ?Sized,
    {
        let result = self.catch_up(sink).await;
        if let Err(e) = &result {
            POLL_CYCLE_FAILURES
                .with_label_values(&[self.signature.name()])
                .inc();
            warn!(
                subsystem = SUBSYSTEM,
                signature = %self.signature,
                watermark = %self.watermark,
                error = %e,
                "Poll cycle failed"
            );
        }
        result
    }

    async fn catch_up<K>(&mut self, sink: &mut K) -> Result<CycleReport, SyncError>
    where
        K: EventSink + ?Sized,
    {
        let latest = self.source.latest_block().await?;
        let mut report = CycleReport {
            latest_block: latest,
            ..CycleReport::default()
        };

        let Some(start) = self.watermark.get() else {
            self.watermark.advance_to(latest);
            self.publish_watermark();
            info!(
                subsystem = SUBSYSTEM,
                signature = %self.signature,
                block = latest,
                "Watermark initialized at chain head"
            );
            report.watermark = self.watermark.get();
            return Ok(report);
        };

        let topic = self.signature.topic();
        for window in windows(start, latest, self.config.window_size) {
            let query = LogQuery {
                from_block: window.from,
                to_block: window.to,
                address: self.contract,
                topic,
            };
            let mut logs = {
                let _timer = HistogramTimer::new(&LOG_QUERY_DURATION);
                self.source.get_logs(&query).await?
            };
            logs.sort_by_key(LogRecord::position);

            let label = [self.signature.name()];
            LOGS_FETCHED.with_label_values(&label).inc_by(logs.len() as f64);
            report.logs_fetched += logs.len();

            for log in &logs {
                match decode_log(self.signature, log) {
                    Ok(event) => {
                        sink.forward(event).await?;
                        EVENTS_FORWARDED.with_label_values(&label).inc();
                        report.events_forwarded += 1;
                    }
                    Err(e) => {
                        DECODE_FAILURES.with_label_values(&label).inc();
                        report.decode_failures += 1;
                        warn!(
                            subsystem = SUBSYSTEM,
                            signature = %self.signature,
                            position = %log.position(),
                            error = %e,
                            "Skipping undecodable log"
                        );
                    }
                }
            }

            self.watermark.advance_to(window.to);
            self.publish_watermark();
            report.windows.push(window);
            log_window_event!(
                debug,
                SUBSYSTEM,
                "Window processed",
                self.signature,
                window.from,
                window.to,
                logs = logs.len()
            );
        }

        report.watermark = self.watermark.get();
        Ok(report)
    }

    fn publish_watermark(&self) {
        if let Some(block) = self.watermark.get() {
            WATERMARK
                .with_label_values(&[self.signature.name()])
                .set(block as f64);
        }
    }
}

impl<S: LogSource + ?Sized + 'static> EventPoller<S> {
    /// Poll until `shutdown` turns true or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles: a cycle in flight finishes
    /// and its events are forwarded. Returns the poller so its watermark can
    /// be inspected or reused.
    pub async fn run<K: EventSink>(mut self, mut sink: K, mut shutdown: watch::Receiver<bool>) -> Self {
        info!(
            subsystem = SUBSYSTEM,
            signature = %self.signature,
            contract = %self.contract,
            interval_ms = self.config.interval_ms,
            "Event poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.poll_cycle(&mut sink).await {
                Ok(report) if !report.windows.is_empty() => {
                    debug!(
                        subsystem = SUBSYSTEM,
                        signature = %self.signature,
                        windows = report.windows.len(),
                        events = report.events_forwarded,
                        watermark = %self.watermark,
                        "Caught up"
                    );
                }
                Ok(_) => {}
                Err(SyncError::SinkClosed(_)) => {
                    info!(
                        subsystem = SUBSYSTEM,
                        signature = %self.signature,
                        "Event sink closed, stopping poller"
                    );
                    break;
                }
                // Already logged; retried next interval.
                Err(_) => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            subsystem = SUBSYSTEM,
            signature = %self.signature,
            watermark = %self.watermark,
            "Event poller stopped"
        );
        self
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn start<K: EventSink + 'static>(self, sink: K) -> PollerHandle<S> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let signature = self.signature;
        let join = tokio::spawn(self.run(sink, shutdown_rx));
        PollerHandle {
            signature,
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Handle to a running poller.
pub struct PollerHandle<S: LogSource + ?Sized> {
    signature: EventSignature,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<EventPoller<S>>,
}

impl<S: LogSource + ?Sized> PollerHandle<S> {
    pub fn signature(&self) -> EventSignature {
        self.signature
    }

    /// Ask the loop to stop after its current cycle.
    pub fn request_stop(&self) {
        // The loop may already have exited on its own.
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the loop and wait for it to finish.
    pub async fn stop(self) -> Result<EventPoller<S>, SyncError> {
        self.request_stop();
        self.join
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::encode_log;
    use crate::domain::SinkClosed;
    use crate::ports::MockLogSource;
    use async_trait::async_trait;
    use shared_bus::{DomainEvent, EventPayload, PlayerMoved};
    use shared_types::{EventPosition, U256};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn contract() -> Address {
        Address::new([0xcc; 20])
    }

    fn moved_log(block: u64, index: u64, x: u64) -> LogRecord {
        let event = DomainEvent::new(
            EventPosition::new(block, index),
            EventPayload::PlayerMoved(PlayerMoved {
                player: Address::new([0xaa; 20]),
                room_id: U256::one(),
                x: U256::from(x),
                y: U256::from(10_000u64),
            }),
        );
        encode_log(contract(), &event)
    }

    fn poller(
        mock: &MockLogSource,
        config: PollerConfig,
    ) -> EventPoller<MockLogSource> {
        EventPoller::new(
            Arc::new(mock.clone()),
            contract(),
            EventSignature::PlayerMoved,
            config,
        )
        .unwrap()
    }

    struct ClosedSink;

    #[async_trait]
    impl EventSink for ClosedSink {
        async fn forward(&mut self, _event: DomainEvent) -> Result<(), SinkClosed> {
            Err(SinkClosed)
        }
    }

    #[tokio::test]
    async fn test_first_cycle_skips_history() {
        let mock = MockLogSource::new(500);
        mock.push_log(moved_log(10, 0, 10_001));
        let mut poller = poller(&mock, PollerConfig::for_testing());
        let mut sink: Vec<DomainEvent> = Vec::new();

        let report = poller.poll_cycle(&mut sink).await.unwrap();
        assert_eq!(report.watermark, Some(500));
        assert!(report.windows.is_empty());
        assert!(mock.queries().is_empty());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_resume_splits_into_bounded_windows() {
        let mock = MockLogSource::new(55);
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let mut sink: Vec<DomainEvent> = Vec::new();

        let report = poller.poll_cycle(&mut sink).await.unwrap();
        let spans: Vec<_> = mock
            .queries()
            .iter()
            .map(|q| (q.from_block, q.to_block))
            .collect();
        assert_eq!(spans, vec![(11, 30), (31, 50), (51, 55)]);
        assert!(mock.queries().iter().all(|q| q.span() <= 20));
        assert_eq!(report.watermark, Some(55));
        assert_eq!(poller.watermark(), Some(55));
    }

    #[tokio::test]
    async fn test_events_forwarded_in_log_order() {
        let mock = MockLogSource::new(100);
        mock.push_log(moved_log(100, 1, 10_002));
        mock.push_log(moved_log(100, 0, 10_001));
        mock.push_log(moved_log(99, 3, 10_000));
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(90));
        let mut sink: Vec<DomainEvent> = Vec::new();

        poller.poll_cycle(&mut sink).await.unwrap();
        let positions: Vec<_> = sink.iter().map(|e| e.position).collect();
        assert_eq!(
            positions,
            vec![
                EventPosition::new(99, 3),
                EventPosition::new(100, 0),
                EventPosition::new(100, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_failure_leaves_watermark() {
        let mock = MockLogSource::new(30);
        mock.push_log(moved_log(15, 0, 10_001));
        mock.fail_next_queries(1);
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let mut sink: Vec<DomainEvent> = Vec::new();

        let err = poller.poll_cycle(&mut sink).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(poller.watermark(), Some(10));
        assert!(sink.is_empty());

        // Same range retried, events delivered once.
        poller.poll_cycle(&mut sink).await.unwrap();
        let froms: Vec<_> = mock.queries().iter().map(|q| q.from_block).collect();
        assert_eq!(froms, vec![11, 11]);
        assert_eq!(sink.len(), 1);
        assert_eq!(poller.watermark(), Some(30));
    }

    #[tokio::test]
    async fn test_head_failure_aborts_cycle() {
        let mock = MockLogSource::new(30);
        mock.set_head_failing(true);
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let mut sink: Vec<DomainEvent> = Vec::new();

        assert!(poller.poll_cycle(&mut sink).await.is_err());
        assert_eq!(poller.watermark(), Some(10));
        assert!(mock.queries().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_log_is_skipped() {
        let mock = MockLogSource::new(20);
        let mut broken = moved_log(12, 0, 10_001);
        broken.data.truncate(10);
        mock.push_log(broken);
        mock.push_log(moved_log(12, 1, 10_002));
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let mut sink: Vec<DomainEvent> = Vec::new();

        let report = poller.poll_cycle(&mut sink).await.unwrap();
        assert_eq!(report.logs_fetched, 2);
        assert_eq!(report.decode_failures, 1);
        assert_eq!(report.events_forwarded, 1);
        assert_eq!(sink[0].position, EventPosition::new(12, 1));
        assert_eq!(poller.watermark(), Some(20));
    }

    #[tokio::test]
    async fn test_closed_sink_holds_watermark() {
        let mock = MockLogSource::new(20);
        mock.push_log(moved_log(12, 0, 10_001));
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));

        let err = poller.poll_cycle(&mut ClosedSink).await.unwrap_err();
        assert!(matches!(err, SyncError::SinkClosed(_)));
        assert_eq!(poller.watermark(), Some(10));
    }

    #[tokio::test]
    async fn test_lagging_head_does_not_rewind() {
        let mock = MockLogSource::new(40);
        let mut poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let mut sink: Vec<DomainEvent> = Vec::new();
        poller.poll_cycle(&mut sink).await.unwrap();
        assert_eq!(poller.watermark(), Some(40));

        mock.set_latest(35);
        let report = poller.poll_cycle(&mut sink).await.unwrap();
        assert!(report.windows.is_empty());
        assert_eq!(poller.watermark(), Some(40));
    }

    #[test]
    fn test_unknown_event_is_configuration_error() {
        let mock = MockLogSource::new(0);
        let result = EventPoller::for_event(
            Arc::new(mock),
            contract(),
            "Foo",
            PollerConfig::default(),
        );
        assert!(matches!(result, Err(SyncError::UnknownSignature(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mock = MockLogSource::new(0);
        let config = PollerConfig {
            window_size: 50,
            ..PollerConfig::default()
        };
        let result = EventPoller::new(Arc::new(mock), contract(), EventSignature::RoomCreated, config);
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_background_loop_delivers_and_stops() {
        let mock = MockLogSource::new(10);
        let poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = poller.start(tx);
        assert_eq!(handle.signature(), EventSignature::PlayerMoved);

        mock.push_log(moved_log(11, 0, 10_005));
        mock.set_latest(11);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.position, EventPosition::new(11, 0));

        let stopped = handle.stop().await.unwrap();
        assert_eq!(stopped.watermark(), Some(11));
    }

    #[tokio::test]
    async fn test_background_loop_exits_when_receiver_dropped() {
        let mock = MockLogSource::new(20);
        mock.push_log(moved_log(15, 0, 10_005));
        let poller = poller(&mock, PollerConfig::for_testing().resuming_after(10));
        let (tx, rx) = mpsc::unbounded_channel::<DomainEvent>();
        drop(rx);

        let handle = poller.start(tx);
        let stopped = tokio::time::timeout(Duration::from_secs(2), handle.stop())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stopped.watermark(), Some(10));
    }
}
