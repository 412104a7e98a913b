#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use voicelink_server::config;
use voicelink_server::logging;
use voicelink_server::server::{RelayServer, ServerConfig};
use voicelink_server::websocket;

/// VoiceLink -- lightweight WebSocket matchmaking and signaling server for 1:1 voice chat
#[derive(Parser, Debug)]
#[command(name = "voicelink-server")]
#[command(about = "A lightweight, in-memory WebSocket matchmaking and signaling relay")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = Arc::new(config::load());

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already calls validate_config_security() but only logs
    // errors to stderr and continues. Capture the result here to provide a
    // proper exit code for --validate-config and to fail startup otherwise.
    let validation_result = config::validate_config_security(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  CORS origins: {}", cfg.security.cors_origins);
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                println!("  Max message size: {}", cfg.security.max_message_size);
                println!(
                    "  Max connections per IP: {}",
                    cfg.security.max_connections_per_ip
                );
                println!(
                    "  Send queue capacity: {}",
                    cfg.websocket.send_queue_capacity
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let port: u16 = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "Starting VoiceLink server");

    // Create server configuration from loaded config
    let server_config = ServerConfig {
        max_message_size: cfg.security.max_message_size,
        max_connections_per_ip: cfg.security.max_connections_per_ip,
        require_metrics_auth: cfg.security.require_metrics_auth,
        metrics_auth_token: cfg.security.metrics_auth_token.clone(),
        waiting_status: cfg.matchmaking.waiting_status.clone(),
        send_queue_capacity: cfg.websocket.send_queue_capacity,
    };

    let relay_server = RelayServer::new(server_config);

    let app = websocket::create_router(&cfg.security.cors_origins)
        .fallback(|| async {
            "VoiceLink Server. Use /ws for the WebSocket protocol, /health for liveness, /metrics for metrics."
        })
        .with_state(relay_server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started - WebSocket: /ws, Metrics: /metrics"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["voicelink-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_long() {
        let cli = Cli::try_parse_from(["voicelink-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["voicelink-server", "-c"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["voicelink-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        // --validate-config and --print-config are mutually exclusive
        let result =
            Cli::try_parse_from(["voicelink-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }

    #[test]
    fn test_cli_help_contains_flags() {
        let result = Cli::try_parse_from(["voicelink-server", "--help"]);
        assert!(result.is_err()); // --help causes early exit which is an "error"
        let err = result.unwrap_err();
        let help_text = err.to_string();
        assert!(help_text.contains("--validate-config"));
        assert!(help_text.contains("--print-config"));
        assert!(help_text.contains("-c"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["voicelink-server", "--version"]);
        assert!(result.is_err()); // --version causes early exit
    }
}
