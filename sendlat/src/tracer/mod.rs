//! eBPF program management and event consumption
//!
//! - [`ebpf_setup`]: load the embedded bytecode, write the target-PID
//!   filter, attach the kprobe pair and the sched_switch tracepoint
//! - [`event_processor`]: decode ring-buffer records and route them
//! - [`stats`]: windowed in-memory store and interval latency summaries

pub mod ebpf_setup;
pub mod event_processor;
pub mod stats;

pub use ebpf_setup::{
    attach_sched_switch, attach_send_probes, bump_memlock_rlimit, init_ebpf_logger, load_tracer,
    set_target_pid, take_event_ring,
};
pub use event_processor::EventProcessor;
pub use stats::{EventStore, SendSummary, DEFAULT_RETENTION_NS};
