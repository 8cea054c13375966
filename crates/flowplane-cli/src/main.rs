//! Flowplane CLI - lifecycle operations against a dataflow control plane.
//!
//! This is the entry point for the `flowplane` binary.

mod commands;

use clap::Parser;
use flowplane_client::{ClientConfig, HttpTransport};
use flowplane_control::{ControlConfig, FlowService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::Command;

/// Flowplane CLI - lifecycle operations against a dataflow control plane.
#[derive(Parser, Debug)]
#[command(name = "flowplane")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Control-plane host and port.
    #[arg(long, env = "NIFI_HOST", default_value = "localhost:8443")]
    host: String,

    /// `http` or `https`.
    #[arg(long, env = "NIFI_HTTP_SCHEME", default_value = "https")]
    scheme: String,

    /// REST API path prefix.
    #[arg(long, env = "NIFI_API_PATH", default_value = "nifi-api")]
    api_path: String,

    /// Username for token login.
    #[arg(long, env = "NIFI_USERNAME")]
    username: Option<String>,

    /// Password for token login.
    #[arg(long, env = "NIFI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, env = "NIFI_REQUEST_TIMEOUT_SECONDS", default_value = "30")]
    request_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::with_host(&self.host);
        config.http_scheme.clone_from(&self.scheme);
        config.api_path.clone_from(&self.api_path);
        config.username.clone_from(&self.username);
        config.password.clone_from(&self.password);
        config.request_timeout_seconds = self.request_timeout;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so command output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flowplane=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client_config = args.client_config();
    tracing::debug!(base_url = %client_config.base_url(), "Connecting to control plane");

    let transport = HttpTransport::connect(client_config).await?;
    let service = FlowService::new(transport, ControlConfig::from_env());

    let output = commands::run(&service, args.command).await?;
    println!("{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_from_flags() {
        let args = Args::try_parse_from([
            "flowplane",
            "--host",
            "nifi.internal:9443",
            "--scheme",
            "http",
            "--username",
            "admin",
            "processor",
            "stop",
            "p1",
        ])
        .unwrap();

        let config = args.client_config();
        assert_eq!(config.base_url(), "http://nifi.internal:9443/nifi-api");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn reporting_task_subcommand() {
        let args = Args::try_parse_from(["flowplane", "reporting-task", "disable", "rt-1"]).unwrap();

        assert!(matches!(
            args.command,
            Command::ReportingTask {
                action: commands::RunAction::Disable { ref id }
            } if id.as_str() == "rt-1"
        ));
    }
}
