use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Default diagnostics port.
pub const STATUS_PORT: u16 = 2285;

/// Process-level settings that are not part of the session.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Where the diagnostics listener binds.
    pub status_addr: SocketAddr,
    /// Connect timeout for control server requests.
    pub connect_timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn with_status_port(mut self, port: u16) -> Self {
        self.status_addr.set_port(port);
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            status_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, STATUS_PORT)),
            connect_timeout: Some(Duration::from_secs(30)),
        }
    }
}
