use std::{net::SocketAddr, time::Duration};

use clap::Parser;

use crate::engine::DEFAULT_LOCK_TIMEOUT;

/// Server settings. Every flag can also be supplied through its environment
/// variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "bank-server")]
#[command(about = "Bank transaction engine over HTTP", long_about = None)]
pub struct Config {
    /// Address the HTTP listener binds to.
    #[arg(long, env = "BANK_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// How long an operation waits for its accounts before giving up.
    #[arg(long, env = "BANK_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "BANK_LOG", default_value = "info")]
    pub log: String,

    /// First number handed out by the customer id generator.
    #[arg(long, env = "BANK_CUSTOMER_ID_START", default_value_t = 1)]
    pub customer_id_start: u64,
}

impl Config {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            log: "info".to_string(),
            customer_id_start: 1,
        }
    }
}
