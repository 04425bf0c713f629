//! Domain model shared by the drover fleet monitor and the task agent.
//!
//! Nothing in this crate performs I/O: it only describes hosts, the
//! predicates used to query them and the messages exchanged with the
//! control server.

mod domain;
pub use domain::*;

mod wire;
pub use wire::*;
