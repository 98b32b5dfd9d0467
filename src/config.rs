use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "feedlizer")]
#[command(about = "Runs the feedlizer service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".feedlizer")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    port: i32,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: i64,
    #[serde(default = "default_article_cache_seconds")]
    pub article_cache_seconds: i64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_dedup_window_ms() -> i64 {
    crate::dedup::DEFAULT_DEDUP_WINDOW_MS
}

fn default_article_cache_seconds() -> i64 {
    120
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for App {
    fn default() -> Self {
        Self {
            port: 12012,
            password: None,
            dedup_window_ms: default_dedup_window_ms(),
            article_cache_seconds: default_article_cache_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl App {
    pub fn get_port(&self) -> i32 {
        return self.port;
    }

    /// Login password, `None` when unset or blank (authentication disabled).
    pub fn get_password(&self) -> Option<&str> {
        non_empty(&self.password)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Feedly {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_feedly_base_url")]
    pub base_url: String,
    #[serde(default = "default_stream_count")]
    pub stream_count: u32,
}

fn default_feedly_base_url() -> String {
    "https://cloud.feedly.com/v3".to_string()
}

fn default_stream_count() -> u32 {
    200
}

impl Default for Feedly {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_feedly_base_url(),
            stream_count: default_stream_count(),
        }
    }
}

impl Feedly {
    pub fn get_token(&self) -> Option<&str> {
        non_empty(&self.token)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Instapaper {
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_instapaper_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub forward_description: bool,
}

fn default_instapaper_base_url() -> String {
    "https://www.instapaper.com/api/1".to_string()
}

impl Default for Instapaper {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            username: None,
            password: None,
            base_url: default_instapaper_base_url(),
            forward_description: false,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Instapaper {
    pub fn get_consumer_key(&self) -> Option<&str> {
        non_empty(&self.consumer_key)
    }

    pub fn get_consumer_secret(&self) -> Option<&str> {
        non_empty(&self.consumer_secret)
    }

    pub fn get_username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    pub fn get_password(&self) -> Option<&str> {
        non_empty(&self.password)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub feedly: Feedly,
    #[serde(default)]
    pub instapaper: Instapaper,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
