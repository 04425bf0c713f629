//! Task agent: runs on a host, executes one task at a time and chains to
//! the next task the control server hands out.
//!
//! The process is made of three concurrent units that share only a
//! read-only [`AgentSnapshot`]:
//! - the execution loop ([`Agent::run`]),
//! - the diagnostics HTTP listener ([`status`]),
//! - the SIGQUIT-triggered state dump ([`dump`]).

mod error;
pub use error::AgentError;

pub mod exit_code;

mod cert;
pub use cert::{Certificate, load_certificate};

mod pidfile;
pub use pidfile::PidFile;

mod session;
pub use session::{AgentSession, HostIdentity, TaskIdentity};

mod config;
pub use config::{AgentConfig, STATUS_PORT};

pub mod client;
pub use client::{ControlServer, HttpControlServer};

pub mod exec;
pub use exec::{CommandExecutor, NoopExecutor, TaskExecutor};

mod agent;
pub use agent::{Agent, AgentExit, AgentPhase, AgentSnapshot};

pub mod status;

pub mod dump;

mod process;
pub use process::{AgentOptions, run_process};
