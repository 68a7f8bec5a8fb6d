//! Relay configuration from the command line.

use std::net::SocketAddr;

use clap::Parser;
use skirmish_client::logging::LogFormat;

/// Websocket room relay for skirmish matches.
#[derive(Debug, Clone, Parser)]
#[command(name = "skirmish_relay")]
#[command(version)]
pub struct RelayConfig {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// How long a player who drops mid-match has to rejoin, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub grace_ms: u64,

    /// How often expired grace windows are checked, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub sweep_ms: u64,

    /// Log line format: pretty or json
    #[arg(long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            grace_ms: 30_000,
            sweep_ms: 250,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser() {
        let parsed = RelayConfig::parse_from(["skirmish_relay"]);
        let defaults = RelayConfig::default();
        assert_eq!(parsed.bind, defaults.bind);
        assert_eq!(parsed.grace_ms, defaults.grace_ms);
        assert_eq!(parsed.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_flags() {
        let parsed = RelayConfig::parse_from([
            "skirmish_relay",
            "--bind",
            "0.0.0.0:9000",
            "--grace-ms",
            "1000",
            "--log-format",
            "json",
        ]);
        assert_eq!(parsed.bind.port(), 9000);
        assert_eq!(parsed.grace_ms, 1_000);
        assert_eq!(parsed.log_format, LogFormat::Json);
    }
}
