//! # sendlat - Main Entry Point
//!
//! Loads the embedded eBPF object, scopes send tracing to an optional
//! target process, attaches the probes, and drains the ring buffer until
//! interrupted (or the duration limit / target process lifetime runs out).

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::time::{Duration, Instant};

use sendlat::cli::Args;
use sendlat::domain::Pid;
use sendlat::preflight::{check_process_exists, run_preflight_checks};
use sendlat::proc_names::ProcNames;
use sendlat::process_lookup::find_process_by_name;
use sendlat::tracer::{
    attach_sched_switch, attach_send_probes, bump_memlock_rlimit, init_ebpf_logger, load_tracer,
    set_target_pid, take_event_ring, EventProcessor,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("cannot use process argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Resolve the target PID from CLI arguments. 0 means trace everything.
fn resolve_target_pid(args: &Args) -> Result<u32> {
    if let Some(ref name) = args.process {
        if args.pid.is_some() {
            bail!(
                "Cannot use PROCESS argument with --pid.\n\n\
                 Use either:\n  \
                 sendlat my-server       (auto-detect)\n  \
                 sendlat --pid 1234      (explicit PID)"
            );
        }
        let info = find_process_by_name(name)?;
        info!("Resolved '{}' to PID {}", info.command, info.pid);
        return Ok(u32::try_from(info.pid.0).unwrap_or(0));
    }

    match args.pid {
        Some(pid) if pid < 0 => bail!("--pid must be zero or positive"),
        Some(pid) => Ok(u32::try_from(pid).unwrap_or(0)),
        None => Ok(0),
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();

    let target_pid = resolve_target_pid(&args)?;

    run_preflight_checks()?;
    if target_pid != 0 {
        check_process_exists(Pid(i32::try_from(target_pid)?))?;
    }

    if !args.quiet {
        println!("sendlat v{}", env!("CARGO_PKG_VERSION"));
        if target_pid == 0 {
            println!("target: all processes");
        } else {
            println!("target pid: {target_pid}");
        }
    }

    // ── Load eBPF and configure before attaching anything ───────────────
    bump_memlock_rlimit();
    let mut bpf = load_tracer()?;
    init_ebpf_logger(&mut bpf);

    // The filter is read-only to the kernel side once probes fire, so it
    // must land before the first attach.
    set_target_pid(&mut bpf, target_pid)?;

    attach_send_probes(&mut bpf)?;
    attach_sched_switch(&mut bpf)?;

    let mut ring_buf = take_event_ring(&mut bpf)?;

    let threshold_ns = args.threshold_us.saturating_mul(1_000);
    let mut processor = EventProcessor::new(threshold_ns);
    let mut names = ProcNames::new();

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let start = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };
    let stats_interval = Duration::from_secs(args.interval.max(1));
    let mut stats_timer = Instant::now();

    // Pre-compute proc path for target liveness check
    let proc_path = format!("/proc/{target_pid}");

    let mut exit_reason = "interrupted";

    // Main event processing loop
    loop {
        if let Some(limit) = duration_limit {
            if start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // A scoped trace ends with its target
        if target_pid != 0 && !std::path::Path::new(&proc_path).exists() {
            exit_reason = "target process exited";
            break;
        }

        // Process all available events
        while let Some(item) = ring_buf.next() {
            processor.process_record(&item);
        }

        if stats_timer.elapsed() >= stats_interval {
            processor.report_interval(&mut names);
            stats_timer = Instant::now();
        }

        // Use select to handle both sleep and Ctrl+C
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    if !args.quiet {
        let elapsed = start.elapsed();
        eprintln!(
            "\n{}: {:.1}s, {} events (sends: {}, switches: {}, anomalies: {}, undecodable: {})",
            exit_reason,
            elapsed.as_secs_f64(),
            processor.event_count,
            processor.send_count,
            processor.sched_count,
            processor.anomaly_count,
            processor.decode_failures,
        );
    }

    Ok(())
}
