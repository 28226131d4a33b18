//! Structured error types for sendlat
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("eBPF program {0} not found in the loaded object")]
    ProgramNotFound(&'static str),

    #[error("eBPF map {0} not found in the loaded object")]
    MapNotFound(&'static str),

    #[error("Failed to attach {probe}: {source}")]
    ProbeAttachFailed {
        probe: &'static str,
        #[source]
        source: aya::programs::ProgramError,
    },

    #[error(transparent)]
    Ebpf(#[from] aya::EbpfError),

    #[error(transparent)]
    Program(#[from] aya::programs::ProgramError),

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),
}
