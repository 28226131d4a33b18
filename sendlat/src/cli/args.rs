//! CLI argument definitions

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "sendlat",
    about = "Trace TCP send latency and scheduler context switches via eBPF",
    after_help = "\
EXAMPLES:
    sudo sendlat                             Trace sends from every process
    sudo sendlat my-server                   Auto-detect PID by process name
    sudo sendlat --pid 1234                  Scope send tracing to one PID
    sudo sendlat --pid 1234 --duration 30    Stop after 30 seconds"
)]
pub struct Args {
    /// Process name to trace (auto-detects PID)
    #[arg(value_name = "PROCESS")]
    pub process: Option<String>,

    /// Process ID to scope send tracing to (omit to trace all processes)
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Seconds between latency summaries
    #[arg(long, default_value = "1")]
    pub interval: u64,

    /// Flag an anomaly when an interval's max send latency exceeds this (microseconds)
    #[arg(long, default_value = "80", value_name = "MICROS")]
    pub threshold_us: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
