//! Wire-format tests against the records the kernel-side probes emit.
//!
//! The kernel side writes a `TraceEvent` value straight into its ring
//! buffer reservation, so the enum's in-memory bytes are the wire format.
//! These tests build records the same way and push them through the
//! userspace decode path.

use sendlat::proc_names::ProcNames;
use sendlat::tracer::EventProcessor;
use sendlat_common::{SchedSwitchEvent, SendEvent, TraceEvent, SCHED_SWITCH_EVENT, SEND_EVENT};

#[allow(unsafe_code)]
fn wire(event: TraceEvent) -> [u8; TraceEvent::WIRE_SIZE] {
    let mut buf = [0u8; TraceEvent::WIRE_SIZE];
    // SAFETY: TraceEvent is repr(C, u32) with WIRE_SIZE == size_of.
    unsafe {
        std::ptr::write_unaligned(buf.as_mut_ptr().cast::<TraceEvent>(), event);
    }
    buf
}

#[test]
fn tag_values_match_the_wire_contract() {
    // The consumer contract: 1 = send, 2 = sched switch, in the first
    // four bytes of every record.
    assert_eq!(SEND_EVENT, 1);
    assert_eq!(SCHED_SWITCH_EVENT, 2);
    assert_eq!(TraceEvent::WIRE_SIZE, 40);
}

#[test]
fn send_fixture_decodes_exactly() {
    // One call sending 64 bytes that took ~2ms: the return probe computes
    // duration as now minus the stored entry timestamp, exactly.
    let entry_ns: u64 = 5_000_000_000;
    let return_ns: u64 = entry_ns + 2_000_000;

    let record = wire(TraceEvent::Send(SendEvent {
        pid: 4242,
        cpu: 2,
        timestamp_ns: return_ns,
        duration_ns: return_ns - entry_ns,
        payload_size: 64,
    }));

    let Some(TraceEvent::Send(event)) = TraceEvent::from_bytes(&record) else {
        panic!("send record did not decode as a send event");
    };
    assert_eq!(event.pid, 4242);
    assert_eq!(event.payload_size, 64);
    assert_eq!(event.duration_ns, 2_000_000);
    assert_eq!(event.timestamp_ns - event.duration_ns, entry_ns);
}

#[test]
fn switch_fixture_decodes_exactly() {
    let record = wire(TraceEvent::SchedSwitch(SchedSwitchEvent {
        prev_pid: 100,
        next_pid: 200,
        cpu: 7,
        _pad: 0,
        timestamp_ns: 42,
    }));

    let Some(TraceEvent::SchedSwitch(event)) = TraceEvent::from_bytes(&record) else {
        panic!("switch record did not decode as a switch event");
    };
    assert_eq!((event.prev_pid, event.next_pid, event.cpu), (100, 200, 7));
}

#[test]
fn processor_handles_an_interleaved_stream() {
    // A send completion followed by arbitrary switch traffic, the way the
    // shared ring buffer actually interleaves them.
    let mut processor = EventProcessor::new(80_000);
    let mut names = ProcNames::new();

    processor.process_record(&wire(TraceEvent::Send(SendEvent {
        pid: 1,
        cpu: 0,
        timestamp_ns: 1_000_000,
        duration_ns: 2_000_000,
        payload_size: 64,
    })));
    for i in 0..5u32 {
        processor.process_record(&wire(TraceEvent::SchedSwitch(SchedSwitchEvent {
            prev_pid: i,
            next_pid: i + 1,
            cpu: 0,
            _pad: 0,
            timestamp_ns: 1_000_000 + u64::from(i),
        })));
    }

    assert_eq!(processor.send_count, 1);
    assert_eq!(processor.sched_count, 5);

    let summary = processor.report_interval(&mut names).expect("one send in the interval");
    assert_eq!(summary.count, 1);
    assert_eq!(summary.max_ns, 2_000_000);
    // 2ms against an 80us threshold is an anomaly
    assert_eq!(processor.anomaly_count, 1);
}

#[test]
fn foreign_records_are_dropped_not_misread() {
    let mut record = [0u8; TraceEvent::WIRE_SIZE];
    record[..4].copy_from_slice(&9u32.to_ne_bytes());
    assert_eq!(TraceEvent::from_bytes(&record), None);

    let mut processor = EventProcessor::new(80_000);
    processor.process_record(&record);
    assert_eq!(processor.decode_failures, 1);
    assert_eq!(processor.send_count + processor.sched_count, 0);
}
