//! Process exit codes of the agent.

/// No more work: the control server said not to run another task.
pub const OK: i32 = 0;
/// Any failure: setup, transport, protocol or session construction.
pub const FAILURE: i32 = 1;
