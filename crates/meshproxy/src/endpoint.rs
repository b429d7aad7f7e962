//! Backend addresses.

use std::fmt;
use std::net::IpAddr;
use std::net::SocketAddr;

use meshwire::Backend;
use serde::Deserialize;
use serde::Serialize;

use crate::config::BackendConfig;

/// A backend address. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    ip: IpAddr,
    port: u16,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // brackets IPv6 hosts
        write!(f, "{}", self.socket_addr())
    }
}

/// One network under management, as described by the parent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedNetwork {
    pub name: String,
    pub controller_ip: IpAddr,
    pub aggregator_ip: IpAddr,
}

impl ManagedNetwork {
    pub fn endpoint(&self, backend: Backend, ports: &BackendConfig) -> Endpoint {
        match backend {
            Backend::Controller => Endpoint::new(self.controller_ip, ports.port(backend)),
            Backend::Aggregator => Endpoint::new(self.aggregator_ip, ports.port(backend)),
        }
    }
}
