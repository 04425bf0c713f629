//! Fleet reconciliation core.
//!
//! - [`registry`]: the persisted host registry contract and an in-memory store.
//! - [`cloud`]: per-provider instance adapters.
//! - [`monitor`]: the periodic reachability sweep keeping the registry in
//!   line with what the providers report.
//! - [`finder`]: discovery of hosts eligible for new work.

pub mod error;
pub use error::{CheckError, CloudError, HostCheckError, MonitorError, RegistryError};

pub mod registry;
pub use registry::{HostRegistry, MemoryHostRegistry};

pub mod cloud;
pub use cloud::{CloudHost, CloudProvider, CloudProviders};

pub mod monitor;
pub use monitor::{MonitorConfig, ReachabilityMonitor, SweepReport};

pub mod finder;
pub use finder::{HostFinder, RegistryHostFinder, StaticHostFinder};

pub mod system;
pub use system::{HostInfo, mark_process_start, process_uptime};
