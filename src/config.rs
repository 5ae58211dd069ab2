//! Server configuration.

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default protocol port.
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration for the server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host/interface to bind.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Docker daemon address ("tcp://host:port"); local socket when unset.
    pub docker_host: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            docker_host: None,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses a port value, falling back to the default on garbage.
    #[must_use]
    pub fn parse_port(value: &str) -> u16 {
        value.parse().unwrap_or(DEFAULT_PORT)
    }
}
