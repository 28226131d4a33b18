//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Event schema and constants shared between the kernel-side probes and the
//! userspace consumer. All wire types use `#[repr(C)]` for a consistent
//! memory layout across the kernel/userspace boundary.
//!
//! ## Key Types
//!
//! - [`TraceEvent`] - Tagged event record pushed through the ring buffer
//! - [`SendEvent`] / [`SchedSwitchEvent`] - Per-kind payloads
//! - [`SendStart`] - Correlation-map value bridging entry and return probes
//! - [`SchedSwitchArgs`] - Tracepoint record layout for `sched_switch`

#![no_std]

use core::mem;

// ============================================================================
// Event Tags
// ============================================================================

/// Tag for [`TraceEvent::Send`]: one completed `tcp_sendmsg` call.
pub const SEND_EVENT: u32 = 1;

/// Tag for [`TraceEvent::SchedSwitch`]: one scheduler context switch.
pub const SCHED_SWITCH_EVENT: u32 = 2;

// ============================================================================
// Map Sizing and Configuration Keys
// ============================================================================

/// Ring buffer capacity in bytes. Shared by both probe kinds; the consumer
/// must drain promptly or producers start dropping.
pub const EVENTS_BYTE_SIZE: u32 = 256 * 1024;

/// Maximum in-flight `tcp_sendmsg` calls tracked at once. Upserts beyond
/// this capacity fail silently and the matching return appears unmatched.
pub const SEND_START_MAX_ENTRIES: u32 = 10240;

/// `CONFIG` map key holding the target process id (0 = trace everything).
/// Written by userspace exactly once, before any program is attached.
pub const CONFIG_TARGET_PID: u32 = 0;

// ============================================================================
// Wire Format
// ============================================================================

/// Payload of a completed TCP send call.
///
/// `duration_ns` is the elapsed time between the entry and return probes of
/// the same call; `payload_size` is the byte count passed to `tcp_sendmsg`,
/// captured at entry (the return value may be a short write or an errno).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendEvent {
    /// Process ID (TGID) that issued the send.
    pub pid: u32,
    /// Logical CPU the return probe observed the completion on.
    pub cpu: u32,
    /// Monotonic nanoseconds at emission (`bpf_ktime_get_ns`).
    pub timestamp_ns: u64,
    /// `timestamp_ns` minus the stored entry timestamp, exactly.
    pub duration_ns: u64,
    /// Bytes the caller asked to send.
    pub payload_size: u64,
}

/// Payload of one scheduler context switch.
///
/// Task ids come from the stable `sched/sched_switch` tracepoint record, so
/// they are thread ids (what the scheduler actually switches). Short task
/// names are not carried; userspace resolves names through `/proc` instead.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedSwitchEvent {
    /// Task being switched out.
    pub prev_pid: u32,
    /// Task being switched in.
    pub next_pid: u32,
    /// Logical CPU the switch happened on.
    pub cpu: u32,
    /// Padding for 8-byte alignment of `timestamp_ns`.
    #[allow(clippy::pub_underscore_fields)]
    pub _pad: u32,
    /// Monotonic nanoseconds at emission.
    pub timestamp_ns: u64,
}

/// Event record sent from eBPF to userspace via the ring buffer.
///
/// A tagged variant rather than one flat struct: fields only meaningful for
/// one event kind simply do not exist on the other, so the consumer cannot
/// misread them. The explicit `repr(C, u32)` layout is a 4-byte tag
/// ([`SEND_EVENT`] or [`SCHED_SWITCH_EVENT`]), 4 bytes of padding, then the
/// payload union. Every record occupies [`TraceEvent::WIRE_SIZE`] bytes in
/// the ring buffer regardless of variant.
#[repr(C, u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Send(SendEvent) = SEND_EVENT,
    SchedSwitch(SchedSwitchEvent) = SCHED_SWITCH_EVENT,
}

// Pin the wire layout. A change here is a cross-boundary ABI break and must
// show up as a compile error, not a decode failure at runtime.
const _: () = assert!(mem::size_of::<SendEvent>() == 32);
const _: () = assert!(mem::size_of::<SchedSwitchEvent>() == 24);
const _: () = assert!(mem::size_of::<TraceEvent>() == 40);
const _: () = assert!(mem::align_of::<TraceEvent>() == 8);

impl TraceEvent {
    /// Fixed size of one ring-buffer record.
    pub const WIRE_SIZE: usize = mem::size_of::<Self>();

    /// Byte offset of the payload union within the record (tag + padding).
    const PAYLOAD_OFFSET: usize = 8;

    /// Decode one fixed-size record as written by the kernel-side probes.
    ///
    /// Returns `None` for truncated buffers and for unknown tags; the
    /// consumer must discriminate on the tag before interpreting payload
    /// bytes, and this is the only place that happens.
    #[must_use]
    #[allow(unsafe_code)]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::WIRE_SIZE {
            return None;
        }

        let mut tag = [0u8; 4];
        tag.copy_from_slice(&bytes[..4]);
        let tag = u32::from_ne_bytes(tag);

        let payload = &bytes[Self::PAYLOAD_OFFSET..];

        // SAFETY: length checked above; SendEvent and SchedSwitchEvent are
        // repr(C) plain-old-data with no invalid bit patterns, and
        // read_unaligned has no alignment requirement on the source.
        match tag {
            SEND_EVENT => {
                let event =
                    unsafe { core::ptr::read_unaligned(payload.as_ptr().cast::<SendEvent>()) };
                Some(TraceEvent::Send(event))
            }
            SCHED_SWITCH_EVENT => {
                let event = unsafe {
                    core::ptr::read_unaligned(payload.as_ptr().cast::<SchedSwitchEvent>())
                };
                Some(TraceEvent::SchedSwitch(event))
            }
            _ => None,
        }
    }

    /// Monotonic timestamp of the record, independent of variant.
    #[must_use]
    pub fn timestamp_ns(&self) -> u64 {
        match self {
            TraceEvent::Send(e) => e.timestamp_ns,
            TraceEvent::SchedSwitch(e) => e.timestamp_ns,
        }
    }
}

// ============================================================================
// Correlation Map Value
// ============================================================================

/// Per-call state written by the entry probe and consumed by the return
/// probe, keyed by the packed `pid_tgid` of the calling thread.
///
/// Entries for calls that never return stay in the map until the same
/// thread starts another send (last-entry-wins overwrite) or the map is
/// torn down at detach. That leak is bounded by map capacity and is not
/// actively reclaimed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SendStart {
    /// Monotonic nanoseconds at entry.
    pub start_ns: u64,
    /// Bytes the caller asked to send, from the `tcp_sendmsg` size argument.
    pub payload_size: u64,
}

// ============================================================================
// Tracepoint Record Layout
// ============================================================================

/// Record layout for `sched/sched_switch`, as published by the kernel in
/// `/sys/kernel/debug/tracing/events/sched/sched_switch/format`.
///
/// Reading the format-defined record sidesteps the raw-tracepoint argument
/// convention entirely (the raw proto is `(preempt, prev, next)`, and
/// off-by-one positional reads silently corrupt both task identities).
#[repr(C)]
pub struct SchedSwitchArgs {
    /// Common tracepoint header.
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,

    /// Command name of the task being switched out.
    pub prev_comm: [u8; 16],
    /// Task id being switched out.
    pub prev_pid: i32,
    /// Priority of the task being switched out.
    pub prev_prio: i32,
    /// Scheduler state of the outgoing task (0 = TASK_RUNNING).
    pub prev_state: i64,

    /// Command name of the task being switched in.
    pub next_comm: [u8; 16],
    /// Task id being switched in.
    pub next_pid: i32,
    /// Priority of the task being switched in.
    pub next_prio: i32,
}
