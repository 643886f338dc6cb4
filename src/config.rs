//! Plugin configuration.
//!
//! `PluginOptions` is what the caller hands over (Rust literal or JSON).
//! `PluginConfig` is the frozen result of merging those options over the
//! defaults. It is built once at registration and only ever shared as
//! `Arc<PluginConfig>`.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::platform::Platform;

pub const DEFAULT_ENDPOINT: &str = "https://tracker.dashbot.io/track";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// One `ignoreUsers` entry as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IgnoreUser {
    Exact(String),
    Pattern { pattern: String },
}

impl IgnoreUser {
    pub fn exact(user_id: impl Into<String>) -> Self {
        IgnoreUser::Exact(user_id.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        IgnoreUser::Pattern { pattern: pattern.into() }
    }
}

/// How the session-ended hook treats a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEndedMode {
    /// Same as any other reply.
    #[default]
    Standard,
    /// Forward placeholder speech when the reply carries none.
    Placeholder,
    /// Only track through this hook when the request really is a `SessionEndedRequest`.
    Guarded,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    pub ignore_users: Vec<IgnoreUser>,
    pub suppress_sending: bool,
    pub debug: bool,
    pub print_errors: Option<bool>,
    pub redact: bool,
    /// Milliseconds.
    pub timeout: Option<u64>,
    #[serde(rename = "api_key")]
    pub api_key: Option<String>,
    pub alexa: Option<String>,
    pub botframework: Option<String>,
    pub dialogflow: Option<String>,
    pub facebook: Option<String>,
    pub google: Option<String>,
    pub session_ended: SessionEndedMode,
    pub endpoint: Option<String>,
}

impl PluginOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn platform_key(&self, platform: Platform) -> Option<&String> {
        match platform {
            Platform::Alexa => self.alexa.as_ref(),
            Platform::BotFramework => self.botframework.as_ref(),
            Platform::Dialogflow => self.dialogflow.as_ref(),
            Platform::Facebook => self.facebook.as_ref(),
            Platform::Google => self.google.as_ref(),
        }
    }
}

/// Compiled ignore rule.
#[derive(Debug, Clone)]
pub enum IgnoreRule {
    Exact(String),
    /// Anchored so only full matches count.
    Pattern(Regex),
}

impl IgnoreRule {
    pub fn matches(&self, user_id: &str) -> bool {
        match self {
            IgnoreRule::Exact(id) => id == user_id,
            IgnoreRule::Pattern(re) => re.is_match(user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub ignore_rules: Vec<IgnoreRule>,
    pub suppress_sending: bool,
    pub debug: bool,
    pub print_errors: bool,
    pub redact: bool,
    pub timeout: Duration,
    pub default_api_key: Option<String>,
    pub platform_api_keys: HashMap<Platform, String>,
    pub session_ended: SessionEndedMode,
    pub endpoint: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            ignore_rules: Vec::new(),
            suppress_sending: false,
            debug: false,
            print_errors: true,
            redact: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            default_api_key: None,
            platform_api_keys: HashMap::new(),
            session_ended: SessionEndedMode::Standard,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl PluginConfig {
    /// Merge caller options over the defaults and compile ignore patterns.
    pub fn from_options(options: PluginOptions) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ignore_rules = options
            .ignore_users
            .iter()
            .map(compile_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let platform_api_keys = Platform::ALL
            .iter()
            .filter_map(|p| options.platform_key(*p).map(|key| (*p, key.clone())))
            .filter(|(_, key)| !key.is_empty())
            .collect();

        Ok(Self {
            ignore_rules,
            suppress_sending: options.suppress_sending,
            debug: options.debug,
            print_errors: options.print_errors.unwrap_or(defaults.print_errors),
            redact: options.redact,
            timeout: options
                .timeout
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            default_api_key: options.api_key.filter(|k| !k.is_empty()),
            platform_api_keys,
            session_ended: options.session_ended,
            endpoint: options.endpoint.unwrap_or(defaults.endpoint),
        })
    }

    /// Platform override first, then the default key.
    pub fn api_key_for(&self, platform: Platform) -> Option<&str> {
        self.platform_api_keys
            .get(&platform)
            .or(self.default_api_key.as_ref())
            .map(String::as_str)
    }
}

fn compile_rule(entry: &IgnoreUser) -> Result<IgnoreRule, ConfigError> {
    match entry {
        IgnoreUser::Exact(id) => Ok(IgnoreRule::Exact(id.clone())),
        IgnoreUser::Pattern { pattern } => Regex::new(&format!("^(?:{})$", pattern))
            .map(IgnoreRule::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }),
    }
}
