//! # Event Processing
//!
//! Consumes records from the eBPF ring buffer and routes them by variant.
//!
//! ## Event Routing
//!
//! - `TraceEvent::Send` → windowed latency statistics
//! - `TraceEvent::SchedSwitch` → scheduler-context window
//!
//! Every interval tick the accumulated send events are summarized; when the
//! interval's worst latency crosses the anomaly threshold, the scheduler
//! window is dumped alongside it to show what the machine was doing.

use log::{debug, info, warn};
use sendlat_common::{SchedSwitchEvent, SendEvent, TraceEvent};

use super::stats::{EventStore, SendSummary, DEFAULT_RETENTION_NS};
use crate::proc_names::ProcNames;

/// Encapsulates event decoding, routing, and per-type counters.
pub struct EventProcessor {
    pub event_count: u64,
    pub send_count: u64,
    pub sched_count: u64,
    pub decode_failures: u64,
    pub anomaly_count: u64,

    anomaly_threshold_ns: u64,
    store: EventStore,
}

impl EventProcessor {
    #[must_use]
    pub fn new(anomaly_threshold_ns: u64) -> Self {
        Self {
            event_count: 0,
            send_count: 0,
            sched_count: 0,
            decode_failures: 0,
            anomaly_count: 0,
            anomaly_threshold_ns,
            store: EventStore::new(DEFAULT_RETENTION_NS),
        }
    }

    /// Decode and route a single ring-buffer record.
    pub fn process_record(&mut self, bytes: &[u8]) {
        self.event_count += 1;
        match TraceEvent::from_bytes(bytes) {
            Some(TraceEvent::Send(event)) => self.on_send(event),
            Some(TraceEvent::SchedSwitch(event)) => self.on_sched_switch(event),
            None => {
                self.decode_failures += 1;
                warn!("Undecodable ring buffer record ({} bytes)", bytes.len());
            }
        }
    }

    /// Interval tick: log a latency summary for the send events received
    /// since the last tick, flag an anomaly if the worst call crossed the
    /// threshold, and prune the retention window.
    ///
    /// Returns the summary so callers and tests can inspect it; `None`
    /// means the interval saw no completed sends.
    pub fn report_interval(&mut self, names: &mut ProcNames) -> Option<SendSummary> {
        let recent = self.store.take_send();
        let summary = SendSummary::from_events(&recent);

        if let Some(summary) = summary {
            info!(
                "tcp send: {} calls, avg {} ns, max {} ns, {} bytes",
                summary.count, summary.avg_ns, summary.max_ns, summary.total_bytes
            );

            if summary.max_ns > self.anomaly_threshold_ns {
                self.anomaly_count += 1;
                let switches = self.store.take_sched();
                warn!(
                    "Latency anomaly: max {} ns exceeds threshold {} ns ({} context switches in window)",
                    summary.max_ns,
                    self.anomaly_threshold_ns,
                    switches.len()
                );
                for event in &switches {
                    debug!(
                        "  sched_switch cpu={} {}({}) -> {}({})",
                        event.cpu,
                        names.lookup(event.prev_pid),
                        event.prev_pid,
                        names.lookup(event.next_pid),
                        event.next_pid
                    );
                }
            }
        }

        self.store.prune();
        summary
    }

    fn on_send(&mut self, event: SendEvent) {
        self.send_count += 1;
        debug!(
            "tcp_send pid={} cpu={} duration_ns={} bytes={}",
            event.pid, event.cpu, event.duration_ns, event.payload_size
        );
        self.store.push_send(event);
    }

    fn on_sched_switch(&mut self, event: SchedSwitchEvent) {
        self.sched_count += 1;
        self.store.push_sched(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(unsafe_code)]
    fn wire(event: TraceEvent) -> [u8; TraceEvent::WIRE_SIZE] {
        let mut buf = [0u8; TraceEvent::WIRE_SIZE];
        // SAFETY: TraceEvent is repr(C, u32) with WIRE_SIZE == size_of.
        unsafe {
            std::ptr::write_unaligned(buf.as_mut_ptr().cast::<TraceEvent>(), event);
        }
        buf
    }

    fn send(duration_ns: u64, payload_size: u64) -> [u8; TraceEvent::WIRE_SIZE] {
        wire(TraceEvent::Send(SendEvent {
            pid: 7,
            cpu: 1,
            timestamp_ns: 1_000,
            duration_ns,
            payload_size,
        }))
    }

    #[test]
    fn routes_by_variant_and_counts() {
        let mut processor = EventProcessor::new(80_000);
        processor.process_record(&send(1_000, 64));
        processor.process_record(&wire(TraceEvent::SchedSwitch(SchedSwitchEvent {
            prev_pid: 1,
            next_pid: 2,
            cpu: 0,
            _pad: 0,
            timestamp_ns: 2_000,
        })));
        assert_eq!(processor.event_count, 2);
        assert_eq!(processor.send_count, 1);
        assert_eq!(processor.sched_count, 1);
        assert_eq!(processor.decode_failures, 0);
    }

    #[test]
    fn garbage_counts_as_decode_failure() {
        let mut processor = EventProcessor::new(80_000);
        processor.process_record(&[0u8; 3]);
        assert_eq!(processor.event_count, 1);
        assert_eq!(processor.decode_failures, 1);
        assert_eq!(processor.send_count, 0);
    }

    #[test]
    fn quiet_interval_reports_nothing() {
        let mut processor = EventProcessor::new(80_000);
        let mut names = ProcNames::new();
        assert_eq!(processor.report_interval(&mut names), None);
    }

    #[test]
    fn interval_summary_drains_the_window() {
        let mut processor = EventProcessor::new(80_000);
        let mut names = ProcNames::new();
        processor.process_record(&send(1_000, 64));
        processor.process_record(&send(3_000, 64));

        let summary = processor.report_interval(&mut names).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.avg_ns, 2_000);
        assert_eq!(summary.max_ns, 3_000);
        assert_eq!(processor.anomaly_count, 0);

        // Already drained: the next tick starts fresh
        assert_eq!(processor.report_interval(&mut names), None);
    }

    #[test]
    fn threshold_crossing_flags_an_anomaly() {
        let mut processor = EventProcessor::new(80_000);
        let mut names = ProcNames::new();
        processor.process_record(&send(2_000_000, 64));
        let summary = processor.report_interval(&mut names).unwrap();
        assert_eq!(summary.max_ns, 2_000_000);
        assert_eq!(processor.anomaly_count, 1);
    }
}
