// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`shell`] runs command lines through the platform shell with inherited
//!   standard streams.
//! - [`supervisor`] owns the build/run cycle of one watcher and the single
//!   long-lived run process it keeps alive.

pub mod shell;
pub mod supervisor;

pub use shell::run_init_commands;
pub use supervisor::{
    BuildOutcome, ExitOutcome, KillFn, ProcessSupervisor, RebuildReport, RunOutcome, SupervisedProcess,
};
