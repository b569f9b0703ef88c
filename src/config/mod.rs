pub mod defaults;
mod validation;

use crate::cli::{ClientArgs, ServerArgs};
use crate::mcp::types::McpToolCall;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use defaults::{
    default_call_arguments, default_call_name, default_connect_timeout, default_host,
    default_keep_alive, default_port, default_request_timeout, default_tool_timeout, default_url,
};
pub use validation::{expand_env_var_in_string, parse_bool};

pub const ENV_HOST: &str = "TOOL_SSE_HOST";
pub const ENV_PORT: &str = "TOOL_SSE_PORT";
pub const ENV_TOOL_TIMEOUT: &str = "TOOL_SSE_TOOL_TIMEOUT";
pub const ENV_URL: &str = "TOOL_SSE_URL";
pub const ENV_TIMEOUT: &str = "TOOL_SSE_TIMEOUT";
pub const ENV_VERBOSE: &str = "TOOL_SSE_VERBOSE";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerFileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientFileConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub client: ClientFileConfig,
    #[serde(default)]
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tool_timeout: Duration,
    pub keep_alive: Duration,
    pub verbose: bool,
}

impl ServerConfig {
    pub fn from_env_and_args(args: &ServerArgs) -> Result<Self, String> {
        let file_config = FileConfig::load().map_err(|e| format!("{:#}", e))?;
        Self::resolve(args, &file_config, |key| env::var(key).ok())
    }

    /// Merges the layers: CLI args > env vars > config file > default.
    pub fn resolve<E>(args: &ServerArgs, file_config: &FileConfig, env_lookup: E) -> Result<Self, String>
    where
        E: Fn(&str) -> Option<String>,
    {
        let host = args
            .host
            .clone()
            .or_else(|| env_lookup(ENV_HOST))
            .or(file_config.server.host.clone())
            .map(|h| expand_env_var_in_string(&h))
            .unwrap_or_else(default_host);

        let port = match args.port {
            Some(port) => port,
            None => env_number::<u16, _>(&env_lookup, ENV_PORT, "a port number")?
                .or(file_config.server.port)
                .unwrap_or_else(default_port),
        };

        let tool_timeout = match args.tool_timeout {
            Some(secs) => secs,
            None => env_number::<u64, _>(&env_lookup, ENV_TOOL_TIMEOUT, "a number of seconds")?
                .or(file_config.server.tool_timeout_secs)
                .unwrap_or_else(default_tool_timeout),
        };

        let keep_alive = file_config
            .server
            .keep_alive_secs
            .unwrap_or_else(default_keep_alive);

        if tool_timeout == 0 || keep_alive == 0 {
            return Err("Timeouts and keep-alive intervals must be at least one second".to_string());
        }

        Ok(ServerConfig {
            host,
            port,
            tool_timeout: Duration::from_secs(tool_timeout),
            keep_alive: Duration::from_secs(keep_alive),
            verbose: resolve_verbose(args.verbose, file_config, &env_lookup),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub verbose: bool,
    pub calls: Vec<McpToolCall>,
}

impl ClientConfig {
    pub fn from_env_and_args(args: &ClientArgs) -> Result<Self, String> {
        let file_config = FileConfig::load().map_err(|e| format!("{:#}", e))?;
        Self::resolve(args, &file_config, |key| env::var(key).ok())
    }

    /// Merges the layers: CLI args > env vars > config file > default.
    pub fn resolve<E>(args: &ClientArgs, file_config: &FileConfig, env_lookup: E) -> Result<Self, String>
    where
        E: Fn(&str) -> Option<String>,
    {
        let url = args
            .url
            .clone()
            .or_else(|| env_lookup(ENV_URL))
            .or(file_config.client.url.clone())
            .map(|u| expand_env_var_in_string(&u))
            .unwrap_or_else(default_url);

        let request_timeout = match args.timeout {
            Some(secs) => secs,
            None => env_number::<u64, _>(&env_lookup, ENV_TIMEOUT, "a number of seconds")?
                .or(file_config.client.request_timeout_secs)
                .unwrap_or_else(default_request_timeout),
        };

        let connect_timeout = file_config
            .client
            .connect_timeout_secs
            .unwrap_or_else(default_connect_timeout);

        if request_timeout == 0 || connect_timeout == 0 {
            return Err("Timeouts must be at least one second".to_string());
        }

        Ok(ClientConfig {
            url,
            request_timeout: Duration::from_secs(request_timeout),
            connect_timeout: Duration::from_secs(connect_timeout),
            verbose: resolve_verbose(args.verbose, file_config, &env_lookup),
            calls: Self::build_calls(args)?,
        })
    }

    /// Pairs each `--call` with the `--args` at the same position.
    fn build_calls(args: &ClientArgs) -> Result<Vec<McpToolCall>, String> {
        if args.calls.is_empty() {
            if args.arguments.len() > 1 {
                return Err("--args given more times than --call".to_string());
            }
            let arguments = match args.arguments.first() {
                Some(raw) => parse_arguments(raw)?,
                None => default_call_arguments(),
            };
            return Ok(vec![McpToolCall {
                name: default_call_name(),
                arguments,
            }]);
        }

        if args.arguments.len() > args.calls.len() {
            return Err("--args given more times than --call".to_string());
        }

        args.calls
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let arguments = match args.arguments.get(i) {
                    Some(raw) => parse_arguments(raw)?,
                    None => Value::Object(Default::default()),
                };
                Ok(McpToolCall {
                    name: name.clone(),
                    arguments,
                })
            })
            .collect()
    }
}

fn parse_arguments(raw: &str) -> Result<Value, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("Invalid --args JSON '{}': {}", raw, e))?;
    if !value.is_object() {
        return Err(format!("--args must be a JSON object, got '{}'", raw));
    }
    Ok(value)
}

/// Reads a numeric environment variable. Set but unparsable is an error.
fn env_number<T, E>(env_lookup: &E, key: &str, expected: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    E: Fn(&str) -> Option<String>,
{
    match env_lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{} must be {}, got '{}'", key, expected, raw)),
        None => Ok(None),
    }
}

fn resolve_verbose<E>(cli_verbose: bool, file_config: &FileConfig, env_lookup: &E) -> bool
where
    E: Fn(&str) -> Option<String>,
{
    cli_verbose
        || env_lookup(ENV_VERBOSE)
            .and_then(|v| parse_bool(&v))
            .or(file_config.verbose)
            .unwrap_or(false)
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            serde_yaml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML config file: {}", path.display())
            })?
        } else {
            serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse JSON config file: {}", path.display())
            })?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            // Current directory first (local override)
            PathBuf::from(".tool-sse.yaml"),
            PathBuf::from(".tool-sse.yml"),
            PathBuf::from(".tool-sse.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("tool-sse");
            paths.push(config_dir.join("tool-sse.yaml"));
            paths.push(config_dir.join("tool-sse.yml"));
            paths.push(config_dir.join("tool-sse.json"));
        }

        paths
    }
}
