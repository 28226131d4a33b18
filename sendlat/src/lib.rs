//! # sendlat - TCP Send Latency and Scheduler Tracing via eBPF
//!
//! `sendlat` brackets the kernel's `tcp_sendmsg` path with a kprobe pair to
//! measure per-call latency, and records every scheduler context switch,
//! streaming both through one shared ring buffer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                eBPF Programs (Kernel)                │
//! │  • Kprobe pair: tcp_sendmsg entry/return             │
//! │  • Tracepoint: sched_switch (system-wide)            │
//! └──────────────────────┬───────────────────────────────┘
//!                        │ ring buffer records
//!                        ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               sendlat (This Crate)                   │
//! │                                                      │
//! │   ┌──────────┐   ┌─────────────┐   ┌─────────────┐   │
//! │   │  Tracer  │──▶│    Event    │──▶│  Windowed   │   │
//! │   │  (eBPF)  │   │  Processor  │   │    Stats    │   │
//! │   └──────────┘   └─────────────┘   └─────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`tracer`]: eBPF program loading, attachment, and event consumption
//! - [`preflight`]: privilege and kernel-version checks before loading
//! - [`process_lookup`]: resolve a process name to a PID via `/proc`
//! - [`proc_names`]: PID to command-name resolution for switch events
//! - [`domain`]: newtypes and structured errors

pub mod cli;
pub mod domain;
pub mod preflight;
pub mod proc_names;
pub mod process_lookup;
pub mod tracer;
