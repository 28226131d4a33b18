//! # eBPF Program Loading and Attachment
//!
//! Loads compiled eBPF bytecode and attaches programs to kernel hook points.
//!
//! ## Attachment Points
//!
//! - **Kprobe/Kretprobe**: `tcp_sendmsg` entry and return
//! - **Tracepoint**: `sched/sched_switch` (every context switch)
//!
//! The target-PID filter must be written with [`set_target_pid`] before any
//! attach call; once probes fire, the kernel side treats the config map as
//! read-only.

#![allow(unsafe_code)] // setrlimit() requires unsafe

use aya::{
    include_bytes_aligned,
    maps::{HashMap, MapData, RingBuf},
    programs::{KProbe, TracePoint},
    Ebpf,
};
use aya_log::EbpfLogger;
use log::{debug, info, warn};
use sendlat_common::CONFIG_TARGET_PID;

use crate::domain::TracerError;

/// Bump the memlock rlimit. Kernels before 5.11 charge eBPF maps against
/// RLIMIT_MEMLOCK instead of memcg, see <https://lwn.net/Articles/837122/>.
pub fn bump_memlock_rlimit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("remove limit on locked memory failed, ret is: {ret}");
    }
}

/// Load the eBPF program binary.
///
/// Always uses the release build; eBPF programs are small and compile fast
/// in release, and debug builds can pull in formatting code the BPF linker
/// rejects.
///
/// # Errors
/// Returns an error if the eBPF program binary cannot be loaded
pub fn load_tracer() -> Result<Ebpf, TracerError> {
    let bpf =
        Ebpf::load(include_bytes_aligned!("../../../target/bpfel-unknown-none/release/sendlat"))?;
    Ok(bpf)
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Write the target PID filter (0 = trace all processes).
///
/// # Errors
/// Returns an error if the `CONFIG` map is missing or the write fails
pub fn set_target_pid(bpf: &mut Ebpf, pid: u32) -> Result<(), TracerError> {
    let mut config: HashMap<_, u32, u64> =
        HashMap::try_from(bpf.map_mut("CONFIG").ok_or(TracerError::MapNotFound("CONFIG"))?)?;
    config.insert(CONFIG_TARGET_PID, u64::from(pid), 0)?;
    if pid == 0 {
        info!("Target PID filter disabled, tracing sends from all processes");
    } else {
        info!("Set target PID: {pid}");
    }
    Ok(())
}

/// Attach the `tcp_sendmsg` entry and return probes.
///
/// # Errors
/// Returns an error if either program is missing or fails to load/attach
pub fn attach_send_probes(bpf: &mut Ebpf) -> Result<(), TracerError> {
    attach_tcp_sendmsg(bpf, "tcp_sendmsg_enter")?;
    attach_tcp_sendmsg(bpf, "tcp_sendmsg_exit")?;
    Ok(())
}

fn attach_tcp_sendmsg(bpf: &mut Ebpf, name: &'static str) -> Result<(), TracerError> {
    let program: &mut KProbe =
        bpf.program_mut(name).ok_or(TracerError::ProgramNotFound(name))?.try_into()?;
    program.load()?;
    program
        .attach("tcp_sendmsg", 0)
        .map_err(|source| TracerError::ProbeAttachFailed { probe: name, source })?;
    info!("Attached {name} to tcp_sendmsg");
    Ok(())
}

/// Attach the scheduler-switch tracepoint.
///
/// # Errors
/// Returns an error if the program is missing or fails to load/attach
pub fn attach_sched_switch(bpf: &mut Ebpf) -> Result<(), TracerError> {
    let program: &mut TracePoint = bpf
        .program_mut("sched_switch_hook")
        .ok_or(TracerError::ProgramNotFound("sched_switch_hook"))?
        .try_into()?;
    program.load()?;
    program
        .attach("sched", "sched_switch")
        .map_err(|source| TracerError::ProbeAttachFailed { probe: "sched_switch_hook", source })?;
    info!("Attached tracepoint: sched/sched_switch");
    Ok(())
}

/// Take ownership of the event ring buffer.
///
/// # Errors
/// Returns an error if the `EVENTS` map is missing or has the wrong type
pub fn take_event_ring(bpf: &mut Ebpf) -> Result<RingBuf<MapData>, TracerError> {
    let ring =
        RingBuf::try_from(bpf.take_map("EVENTS").ok_or(TracerError::MapNotFound("EVENTS"))?)?;
    Ok(ring)
}
