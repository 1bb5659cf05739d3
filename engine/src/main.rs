use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use agentrun_core::{EventBus, RuntimeConfig, SafetyPolicy};
use agentrun_memory::MemoryStore;
use agentrun_providers::build_planner;
use agentrun_runtime::Runtime;
use agentrun_server::{serve, AppState};
use agentrun_tools::ToolRegistry;

#[derive(Parser, Debug)]
#[command(name = "agentrun-engine")]
#[command(about = "Headless AgentRun browsing-agent backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP/WebSocket server.
    Serve {
        #[arg(long, alias = "host", default_value = "127.0.0.1")]
        hostname: String,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Submit a goal to an already-running instance and print the task id.
    Submit {
        goal: String,
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { hostname, port } => {
            let state_dir = resolve_state_dir();
            let logs_dir = agentrun_observability::default_logs_dir(&state_dir);
            let _guard = agentrun_observability::init_logging(&logs_dir, 14)?;

            let config = RuntimeConfig::from_env();
            let policy = SafetyPolicy::from_env();
            // 0 = OS-chosen port (spec default when neither `--port` nor
            // `AGENT_SERVER_PORT` is set); `serve` logs the address it
            // actually binds to once the listener exists.
            let bind_port = port.or(config.server_port).unwrap_or(0);

            let runtime = Runtime::new(EventBus::new(), MemoryStore::new(), ToolRegistry::new(), build_planner(), policy);
            let state = AppState::new(runtime);

            let addr: SocketAddr = format!("{hostname}:{bind_port}").parse().context("invalid hostname or port")?;
            info!(model_provider = %config.model_provider, "starting agentrun-engine");
            serve(addr, state).await?;
        }
        Command::Submit { goal, server } => {
            let client = reqwest::Client::new();
            let response = client
                .post(format!("{server}/tasks"))
                .json(&serde_json::json!({ "goal": goal }))
                .send()
                .await
                .context("failed to reach agentrun server")?;

            let status = response.status();
            let body: serde_json::Value = response.json().await.context("server returned a non-JSON response")?;

            if !status.is_success() {
                anyhow::bail!("server rejected task: {}", body.get("error").and_then(|e| e.as_str()).unwrap_or("unknown error"));
            }

            let id = body["task"]["id"].as_str().context("server response missing task id")?;
            println!("{id}");
        }
    }

    Ok(())
}

fn resolve_state_dir() -> PathBuf {
    match std::env::var("AGENT_STATE_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(".agentrun"),
    }
}
