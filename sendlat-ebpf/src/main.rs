//! # eBPF Kernel-Side Instrumentation
//!
//! eBPF programs that run inside the Linux kernel to trace TCP send latency
//! and scheduler activity.
//!
//! ## Programs
//!
//! - **Kprobe/Kretprobe**: `tcp_sendmsg_enter` / `tcp_sendmsg_exit` -
//!   bracket `tcp_sendmsg` and emit one duration event per completed call
//! - **Tracepoint**: `sched_switch_hook` - emits one event per context
//!   switch, system-wide
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Ring buffer (256KB) for the event stream
//! - `SEND_START` - In-flight send calls, keyed by `pid_tgid`
//! - `CONFIG` - Target PID filter, written once before attach
//!
//! Probe bodies run on whatever kernel thread triggered them, concurrently
//! across all cores. Nothing here may block, spin, or allocate: every
//! failure path is a silent drop.
//!
//! ## Build
//!
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_get_current_pid_tgid, bpf_get_smp_processor_id, bpf_ktime_get_ns},
    macros::{kprobe, kretprobe, map, tracepoint},
    maps::{HashMap, RingBuf},
    programs::{ProbeContext, RetProbeContext, TracePointContext},
    EbpfContext,
};
use sendlat_common::{
    SchedSwitchArgs, SchedSwitchEvent, SendEvent, SendStart, TraceEvent, CONFIG_TARGET_PID,
    EVENTS_BYTE_SIZE, SEND_START_MAX_ENTRIES,
};

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Ring buffer carrying [`TraceEvent`] records to userspace.
///
/// Reservation is non-blocking: a full buffer means the record is dropped
/// and the probe returns immediately. Fewer events under load, never a
/// stalled kernel path.
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(EVENTS_BYTE_SIZE, 0);

/// Map: packed `pid_tgid` → state of the in-flight `tcp_sendmsg` call.
///
/// Written by the entry probe, consumed and deleted by the return probe.
/// One thread can only run one send call at a time, so entry/return pairing
/// is sequential per key; concurrent traffic only ever touches distinct
/// keys.
#[map]
static SEND_START: HashMap<u64, SendStart> = HashMap::with_max_entries(SEND_START_MAX_ENTRIES, 0);

/// Map: config key → config value.
///
/// Holds the target PID filter at [`CONFIG_TARGET_PID`]. Userspace writes
/// it exactly once, before any program is attached; probes only read.
#[map]
static CONFIG: HashMap<u32, u64> = HashMap::with_max_entries(1, 0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: entry of `tcp_sendmsg(struct sock *sk, struct msghdr *msg, size_t size)`.
#[kprobe]
pub fn tcp_sendmsg_enter(ctx: ProbeContext) -> u32 {
    match try_tcp_sendmsg_enter(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_tcp_sendmsg_enter(ctx: &ProbeContext) -> Result<(), i64> {
    let id = unsafe { bpf_get_current_pid_tgid() };
    let pid = (id >> 32) as u32;

    if !pid_matches_target(pid) {
        return Ok(());
    }

    // Payload size is only visible here; the return value may be a short
    // write or an errno.
    let payload_size: u64 = ctx.arg(2).ok_or(1i64)?;

    let start = SendStart { start_ns: unsafe { bpf_ktime_get_ns() }, payload_size };

    // Last entry wins: a stale record from a call that never returned is
    // overwritten here. A full map drops this call instead, and its return
    // will show up unmatched.
    let _ = SEND_START.insert(&id, &start, 0);

    Ok(())
}

/// Hook: return of `tcp_sendmsg`.
#[kretprobe]
pub fn tcp_sendmsg_exit(_ctx: RetProbeContext) -> u32 {
    match try_tcp_sendmsg_exit() {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_tcp_sendmsg_exit() -> Result<(), i64> {
    let id = unsafe { bpf_get_current_pid_tgid() };
    let pid = (id >> 32) as u32;

    if !pid_matches_target(pid) {
        return Ok(());
    }

    // No entry means we missed the start (attach race or map eviction).
    // Defined outcome, no event.
    let Some(start) = (unsafe { SEND_START.get(&id).copied() }) else {
        return Ok(());
    };

    // Consume the entry before emitting so a full ring buffer cannot also
    // leak correlation state.
    let _ = SEND_START.remove(&id);

    let now = unsafe { bpf_ktime_get_ns() };

    let Some(mut entry) = EVENTS.reserve::<TraceEvent>(0) else {
        return Ok(());
    };
    entry.write(TraceEvent::Send(SendEvent {
        pid,
        cpu: unsafe { bpf_get_smp_processor_id() },
        timestamp_ns: now,
        duration_ns: now - start.start_ns,
        payload_size: start.payload_size,
    }));
    entry.submit(0);

    Ok(())
}

/// Hook: `sched/sched_switch` tracepoint. Fires on every context switch,
/// system-wide; the target PID filter deliberately does not apply here.
#[tracepoint]
pub fn sched_switch_hook(ctx: TracePointContext) -> u32 {
    match try_sched_switch(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sched_switch(ctx: &TracePointContext) -> Result<(), i64> {
    // Layout from /sys/kernel/debug/tracing/events/sched/sched_switch/format
    let args: *const SchedSwitchArgs = ctx.as_ptr() as *const SchedSwitchArgs;
    let prev_pid = unsafe { (*args).prev_pid } as u32;
    let next_pid = unsafe { (*args).next_pid } as u32;

    // Switch events are high-frequency; when the consumer falls behind,
    // drop without retry rather than stalling the scheduler.
    let Some(mut entry) = EVENTS.reserve::<TraceEvent>(0) else {
        return Ok(());
    };
    entry.write(TraceEvent::SchedSwitch(SchedSwitchEvent {
        prev_pid,
        next_pid,
        cpu: unsafe { bpf_get_smp_processor_id() },
        _pad: 0,
        timestamp_ns: unsafe { bpf_ktime_get_ns() },
    }));
    entry.submit(0);

    Ok(())
}

// Helper: check the current PID against the configured target (0 = all).
fn pid_matches_target(pid: u32) -> bool {
    let target = unsafe { CONFIG.get(&CONFIG_TARGET_PID).map(|v| *v as u32).unwrap_or(0) };
    target == 0 || pid == target
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
