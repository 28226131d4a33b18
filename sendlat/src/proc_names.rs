//! PID to command-name resolution.
//!
//! The wire format carries no task names (resolving them in the kernel
//! costs ring-buffer bytes on every switch), so scheduler events are
//! rendered with names looked up from `/proc/<pid>/comm` here. Results are
//! cached, including negative ones: under churn the same short-lived PIDs
//! show up many times after they are already gone.

use std::collections::HashMap;
use std::fs;

/// Name reported for task id 0 (the per-CPU idle task, never in /proc).
const IDLE_TASK: &str = "swapper";

#[derive(Default)]
pub struct ProcNames {
    cache: HashMap<u32, Option<String>>,
}

impl ProcNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a task id to its command name, or `pid-<n>` if the task is
    /// gone or unreadable.
    pub fn lookup(&mut self, pid: u32) -> String {
        if pid == 0 {
            return IDLE_TASK.to_string();
        }
        self.cache
            .entry(pid)
            .or_insert_with(|| read_comm(pid))
            .clone()
            .unwrap_or_else(|| format!("pid-{pid}"))
    }
}

fn read_comm(pid: u32) -> Option<String> {
    let comm = fs::read_to_string(format!("/proc/{pid}/comm")).ok()?;
    let comm = comm.trim_end_matches('\n');
    if comm.is_empty() {
        None
    } else {
        Some(comm.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_task_is_swapper() {
        let mut names = ProcNames::new();
        assert_eq!(names.lookup(0), "swapper");
    }

    #[test]
    fn resolves_own_process() {
        let mut names = ProcNames::new();
        let me = std::process::id();
        let name = names.lookup(me);
        assert!(!name.is_empty());
        assert_ne!(name, format!("pid-{me}"));
        // Second lookup hits the cache and agrees
        assert_eq!(names.lookup(me), name);
    }

    #[test]
    fn dead_pid_gets_fallback_name() {
        let mut names = ProcNames::new();
        // PID_MAX_LIMIT is 2^22; nothing real lives up here
        let bogus = u32::MAX - 1;
        assert_eq!(names.lookup(bogus), format!("pid-{bogus}"));
    }
}
