use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use tool_sse::cli::ServerArgs;
use tool_sse::config::ServerConfig;
use tool_sse::logging;
use tool_sse::server::{self, ToolServer};
use tool_sse::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    let config = ServerConfig::from_env_and_args(&args).map_err(anyhow::Error::msg)?;

    logging::init(config.verbose, "info");

    let registry = ToolRegistry::with_builtin_tools()?;
    let names: Vec<&str> = registry.list().into_iter().map(|t| t.name.as_str()).collect();
    info!(tools = ?names, "Registered tools");

    let server = Arc::new(ToolServer::new(registry, config.tool_timeout));
    let listener = server::bind(&config.host, config.port).await?;

    server::serve(listener, server, config.keep_alive, server::shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}
