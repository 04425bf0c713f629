mod error;
pub use error::ModelError;

mod ids;
pub use ids::{HostId, TaskId};

mod secret;
pub use secret::Secret;

mod host_status;
pub use host_status::HostStatus;

mod cloud_status;
pub use cloud_status::CloudStatus;

mod host;
pub use host::Host;

mod host_query;
pub use host_query::HostQuery;

pub(crate) mod unix_secs;

/// Name of the cloud provider a host was provisioned from.
///
/// Used as the lookup key when binding a host to its provider adapter.
pub type ProviderKey = String;
