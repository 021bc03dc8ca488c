use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "stomp")]
#[command(version)]
#[command(about = "Interactive STOMP client CLI")]
pub struct Cli {
    /// Broker URL: host:port, tcp://host:port, or ws(s)://... with the websocket feature
    #[arg(short, long, default_value = "127.0.0.1:61613")]
    pub url: String,

    /// Login username
    #[arg(short, long, default_value = "guest")]
    pub login: String,

    /// Passcode
    #[arg(short, long, default_value = "guest")]
    pub passcode: String,

    /// Virtual host sent in the CONNECT `host` header
    #[arg(long)]
    pub host: Option<String>,

    /// Heartbeat settings (client-send,client-receive in ms)
    #[arg(long, default_value = "10000,10000")]
    pub heartbeat: String,

    /// Reconnect this many milliseconds after losing the connection (0 disables)
    #[arg(long, default_value_t = 0)]
    pub reconnect_ms: u64,

    /// Destinations to subscribe to (can be specified multiple times)
    #[arg(short, long)]
    pub subscribe: Vec<String>,

    /// Log wire traffic (repeat for more detail); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "stomp_ws=info",
            2 => "stomp_ws=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["stomp"]);
        assert_eq!(cli.url, "127.0.0.1:61613");
        assert_eq!(cli.heartbeat, "10000,10000");
        assert_eq!(cli.reconnect_ms, 0);
        assert!(cli.subscribe.is_empty());
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn repeated_flags() {
        let cli = Cli::parse_from(["stomp", "-s", "/queue/a", "-s", "/topic/b", "-vv"]);
        assert_eq!(cli.subscribe, vec!["/queue/a", "/topic/b"]);
        assert_eq!(cli.log_filter(), "stomp_ws=debug");
    }
}
