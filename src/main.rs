//! zkchroot CLI entry point.

use clap::{Parser, Subcommand, ValueEnum};
use zkchroot::config::ClientConfig;
use tracing_subscriber::EnvFilter;

mod cli;

/// zkchroot - chroot-aware coordination-service client
#[derive(Parser, Debug)]
#[command(name = "zkchroot")]
#[command(about = "Chroot-aware coordination-service client")]
#[command(version)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect, resolve the chroot and report the result.
    Check(cli::check::CheckCmd),

    /// List the children of a node.
    #[command(alias = "ls")]
    List(cli::list::ListCmd),

    /// Print a node's data.
    Get(cli::get::GetCmd),

    /// Replace a node's data.
    Set(cli::set::SetCmd),

    /// Create a node.
    Create(cli::create::CreateCmd),

    /// Create nodes and any missing parents.
    Mkdir(cli::mkdir::MkdirCmd),

    /// Delete a node.
    #[command(alias = "rm")]
    Delete(cli::delete::DeleteCmd),

    /// Show or update default connection settings.
    Config(cli::config::ConfigCmd),

    /// Run a development server backed by an in-memory tree.
    Serve(cli::serve::ServeCmd),
}

/// Log line format on stderr.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to warn
    init_logging(cli.log_format);

    tracing::debug!(version = zkchroot::VERSION, "starting zkchroot");

    // Load configuration
    let mut config = match ClientConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            ClientConfig::default()
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Check(cmd) => cmd.run(&config),
        Commands::List(cmd) => cmd.run(&config),
        Commands::Get(cmd) => cmd.run(&config),
        Commands::Set(cmd) => cmd.run(&config),
        Commands::Create(cmd) => cmd.run(&config),
        Commands::Mkdir(cmd) => cmd.run(&config),
        Commands::Delete(cmd) => cmd.run(&config),
        Commands::Config(cmd) => cmd.run(&mut config),
        Commands::Serve(cmd) => cmd.run(),
    };

    // Handle errors
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("zkchroot=warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mkdir_takes_several_paths() {
        let cli = Cli::try_parse_from(["zkchroot", "mkdir", "/a/b", "/c", "-s", "zk1:2181/app"])
            .unwrap();
        match cli.command {
            Commands::Mkdir(cmd) => {
                assert_eq!(cmd.paths, vec!["/a/b", "/c"]);
                assert_eq!(cmd.connect.server.as_deref(), Some("zk1:2181/app"));
            }
            other => panic!("expected mkdir, got {:?}", other),
        }
        assert!(Cli::try_parse_from(["zkchroot", "mkdir"]).is_err());
    }

    #[test]
    fn test_log_format_is_global() {
        let cli = Cli::try_parse_from(["zkchroot", "ls", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);

        let cli = Cli::try_parse_from(["zkchroot", "get", "/a"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_serve_listens_on_client_port_by_default() {
        let cli = Cli::try_parse_from(["zkchroot", "serve"]).unwrap();
        let Commands::Serve(cmd) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(cmd.listen_addr().port(), zkchroot_protocol::ports::CLIENT);
    }
}
