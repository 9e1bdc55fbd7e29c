//! Command-line configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

/// PixelDuo relay server
#[derive(Debug, Clone, Parser)]
#[command(name = "pixelduo-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "PIXELDUO_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
