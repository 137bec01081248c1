//! mcpchat — chat with a language model that can call MCP server tools.

use anyhow::{Context, Result};
use clap::Parser;
use mcpchat_api::OpenAiInteractor;
use mcpchat_config::{ChatConfig, CliOverrides, ServerSettings};
use mcpchat_core::McpChatClient;
use mcpchat_mcp::McpConnector;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(
    name = "mcpchat",
    version,
    about = "Chat with a language model that can call MCP server tools"
)]
struct Cli {
    /// Server script (.js or .py) or http(s):// SSE endpoint
    server: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Chat-completions base URL (overrides OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// API key sent to a remote MCP server
    #[arg(long)]
    server_api_key: Option<String>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = ChatConfig::load(CliOverrides {
        api_key: cli.api_key,
        model: cli.model,
        base_url: cli.base_url,
        server: cli.server,
        server_api_key: cli.server_api_key,
    })
    .context("Failed to load configuration")?;

    let Some(server) = config.server.clone() else {
        print_usage();
        return Ok(());
    };

    let api_key = config.require_api_key()?.to_string();
    let interactor = OpenAiInteractor::new(Some(api_key), &config.model, &config.base_url)
        .context("Failed to create model client")?;
    tracing::debug!("Using model {} at {}", config.model, config.base_url);

    let mut connector = McpConnector::new();
    if let Some(timeout) = server.request_timeout() {
        connector = connector.with_request_timeout(timeout);
    }

    let mut client = McpChatClient::new(Box::new(connector), Box::new(interactor))
        .with_sampling(config.temperature, config.max_tokens);

    let result = run(&mut client, &server).await;
    client.cleanup().await;
    result
}

async fn run(client: &mut McpChatClient, server: &ServerSettings) -> Result<()> {
    client
        .connect_to_server(&server.connection)
        .await
        .with_context(|| format!("Failed to connect to MCP server {}", server.connection))?;

    let names: Vec<&str> = client
        .tools()?
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    eprintln!("{}", format_tool_list(&names));

    chat_loop(client).await
}

/// Read queries until `quit` or end of input. A failed query ends the loop.
async fn chat_loop(client: &McpChatClient) -> Result<()> {
    let stdin = io::stdin();

    eprintln!("\nmcpchat v{} started!", env!("CARGO_PKG_VERSION"));
    eprintln!("Type your question, or 'quit' to exit.");

    loop {
        eprint!("\nQuery: ");
        io::stderr().flush()?;

        let mut input = String::new();
        let bytes_read = stdin.lock().read_line(&mut input)?;
        if bytes_read == 0 {
            eprintln!();
            break;
        }

        let input = strip_line_ending(&input);
        if input.trim().is_empty() {
            continue;
        }
        if is_quit(input) {
            break;
        }

        let answer = client.process_query(input).await.context("Query failed")?;
        println!("\n{answer}");
    }

    Ok(())
}

/// Drop the line terminator only; surrounding spaces belong to the query.
fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit")
}

fn format_tool_list(names: &[&str]) -> String {
    if names.is_empty() {
        "Connected to MCP server (no tools available)".to_string()
    } else {
        format!(
            "Connected to MCP server with tools: {}",
            names.join(", ")
        )
    }
}

fn print_usage() {
    eprintln!("Usage: mcpchat [OPTIONS] <SERVER>");
    eprintln!();
    eprintln!("  SERVER  path to a .js or .py MCP server script,");
    eprintln!("          or an http(s):// SSE endpoint");
    eprintln!();
    eprintln!("A default server can also be set under [server] in ~/.mcpchat/config.toml.");
    eprintln!("Run `mcpchat --help` for all options.");
}
