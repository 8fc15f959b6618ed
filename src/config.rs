use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    pub pool_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "openai" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Env file loaded into the process environment before anything else
    #[arg(long, value_name = "FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// Environment variable names and the config keys they override.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASS", "database.password"),
    ("DB_NAME", "database.name"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("ENDPOINT_HOST", "web.host"),
    ("ENDPOINT_PORT", "web.port"),
    ("LLM_BACKEND", "llm.backend"),
    ("LLM_MODEL", "llm.model"),
    ("LLM_API_URL", "llm.api_url"),
    ("OPENAI_API_KEY", "llm.api_key"),
];

impl AppConfig {
    /// Builds the configuration from defaults, an optional TOML file, the
    /// variables returned by `lookup`, and finally the CLI arguments.
    pub fn load<F>(args: &CliArgs, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config_builder = Config::builder()
            .set_default("database.host", "127.0.0.1")?
            .set_default("database.port", 3306)?
            .set_default("database.password", "")?
            .set_default("database.pool_size", 5)?
            .set_default("web.host", "0.0.0.0")?
            .set_default("web.port", 8080)?
            .set_default("llm.backend", "openai")?
            .set_default("llm.model", "gpt-4-turbo")?;

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/sqlgate/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        for &(var, key) in ENV_OVERRIDES {
            config_builder = config_builder.set_override_option(key, lookup(var))?;
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Command line wins over everything else
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        Ok(config)
    }

    /// Same as [`AppConfig::load`], reading variables from the process environment.
    pub fn from_env(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::load(args, |key| std::env::var(key).ok())
    }
}
