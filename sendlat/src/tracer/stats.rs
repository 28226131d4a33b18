//! Windowed in-memory event store and latency summaries.
//!
//! Events live in memory only and only for a short wall-clock window: long
//! enough to explain a latency spike with the scheduler activity around it,
//! short enough that a busy box with thousands of switches per second stays
//! bounded.

use sendlat_common::{SchedSwitchEvent, SendEvent};

/// How far back scheduler context is kept, in monotonic nanoseconds.
pub const DEFAULT_RETENTION_NS: u64 = 2_000_000_000;

/// Recent events, pruned by timestamp against the newest record seen.
pub struct EventStore {
    send: Vec<SendEvent>,
    sched: Vec<SchedSwitchEvent>,
    retention_ns: u64,
}

impl EventStore {
    #[must_use]
    pub fn new(retention_ns: u64) -> Self {
        Self { send: Vec::new(), sched: Vec::new(), retention_ns }
    }

    pub fn push_send(&mut self, event: SendEvent) {
        self.send.push(event);
    }

    pub fn push_sched(&mut self, event: SchedSwitchEvent) {
        self.sched.push(event);
    }

    /// Drain the send events accumulated since the last interval tick.
    pub fn take_send(&mut self) -> Vec<SendEvent> {
        std::mem::take(&mut self.send)
    }

    /// Drain the retained scheduler-switch window.
    pub fn take_sched(&mut self) -> Vec<SchedSwitchEvent> {
        std::mem::take(&mut self.sched)
    }

    #[must_use]
    pub fn sched_len(&self) -> usize {
        self.sched.len()
    }

    /// Drop everything older than the retention horizon, measured from the
    /// newest timestamp seen in either stream. Ring-buffer records from
    /// different cores arrive slightly out of order, so this filters by
    /// timestamp rather than assuming sorted input.
    pub fn prune(&mut self) {
        let latest = self
            .send
            .iter()
            .map(|e| e.timestamp_ns)
            .chain(self.sched.iter().map(|e| e.timestamp_ns))
            .max();
        let Some(latest) = latest else {
            return;
        };
        let cutoff = latest.saturating_sub(self.retention_ns);
        self.send.retain(|e| e.timestamp_ns >= cutoff);
        self.sched.retain(|e| e.timestamp_ns >= cutoff);
    }
}

/// Latency summary over one stats interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    pub count: usize,
    pub avg_ns: u64,
    pub max_ns: u64,
    pub total_bytes: u64,
}

impl SendSummary {
    /// Summarize an interval's send events. `None` for an empty interval.
    #[must_use]
    pub fn from_events(events: &[SendEvent]) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        let mut total_ns: u64 = 0;
        let mut max_ns: u64 = 0;
        let mut total_bytes: u64 = 0;
        for event in events {
            total_ns += event.duration_ns;
            max_ns = max_ns.max(event.duration_ns);
            total_bytes += event.payload_size;
        }
        Some(Self {
            count: events.len(),
            avg_ns: total_ns / events.len() as u64,
            max_ns,
            total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(timestamp_ns: u64, duration_ns: u64, payload_size: u64) -> SendEvent {
        SendEvent { pid: 1, cpu: 0, timestamp_ns, duration_ns, payload_size }
    }

    fn switch(timestamp_ns: u64) -> SchedSwitchEvent {
        SchedSwitchEvent { prev_pid: 1, next_pid: 2, cpu: 0, _pad: 0, timestamp_ns }
    }

    #[test]
    fn summary_of_empty_interval_is_none() {
        assert_eq!(SendSummary::from_events(&[]), None);
    }

    #[test]
    fn summary_computes_count_avg_max_bytes() {
        let events = [send(10, 1_000, 64), send(20, 3_000, 128), send(30, 2_000, 64)];
        let summary = SendSummary::from_events(&events).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.avg_ns, 2_000);
        assert_eq!(summary.max_ns, 3_000);
        assert_eq!(summary.total_bytes, 256);
    }

    #[test]
    fn take_send_drains() {
        let mut store = EventStore::new(DEFAULT_RETENTION_NS);
        store.push_send(send(1, 10, 1));
        store.push_send(send(2, 20, 2));
        assert_eq!(store.take_send().len(), 2);
        assert!(store.take_send().is_empty());
    }

    #[test]
    fn prune_keeps_only_the_retention_window() {
        let mut store = EventStore::new(1_000);
        store.push_sched(switch(100));
        store.push_sched(switch(500));
        store.push_sched(switch(1_600));
        // newest is 1_600, cutoff 600: the first switch falls out
        store.prune();
        assert_eq!(store.sched_len(), 2);
        assert_eq!(store.take_sched()[0].timestamp_ns, 500);
    }

    #[test]
    fn prune_uses_newest_timestamp_across_streams() {
        let mut store = EventStore::new(1_000);
        store.push_sched(switch(100));
        store.push_send(send(2_000, 5, 1));
        store.prune();
        // send at 2_000 moves the cutoff to 1_000, expiring the switch
        assert_eq!(store.sched_len(), 0);
        assert_eq!(store.take_send().len(), 1);
    }

    #[test]
    fn prune_on_empty_store_is_a_noop() {
        let mut store = EventStore::new(1_000);
        store.prune();
        assert_eq!(store.sched_len(), 0);
    }

    #[test]
    fn out_of_order_arrivals_prune_by_timestamp_not_position() {
        let mut store = EventStore::new(1_000);
        store.push_sched(switch(3_000));
        store.push_sched(switch(100)); // late arrival from another core
        store.push_sched(switch(2_500));
        store.prune();
        let kept = store.take_sched();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|e| e.timestamp_ns >= 2_000));
    }
}
