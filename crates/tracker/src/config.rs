use std::path::PathBuf;
use std::time::Duration;

use reelwatch_client::api::DEFAULT_REQUEST_TIMEOUT;
use reelwatch_engine::config::DEFAULT_POLL_INTERVAL;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_SCOPE: &str = "all";
const DEFAULT_SETTINGS_PATH: &str = "reelwatch-settings.json";
const DEFAULT_SOUND_COMMAND: &str = "paplay /usr/share/sounds/freedesktop/stereo/complete.oga";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),

    #[error("{var} has an unterminated quote: {value:?}")]
    UnterminatedQuote { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Tracker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub api_url: String,
    /// Bearer token for the job API; no `Authorization` header when unset.
    pub api_token: Option<String>,
    /// Activation key: `all`, `none`, or a channel id.
    pub scope: String,
    pub poll_interval: Duration,
    pub settings_path: PathBuf,
    /// Program and arguments used to play the "video ready" sound. Split
    /// like a shell word list: quote or backslash-escape paths with spaces.
    pub sound_command: Vec<String>,
    /// Device token for push enrollment; push is unavailable when unset.
    pub push_token: Option<String>,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                   |
    /// |----------------------------------|---------------------------|
    /// | `REELWATCH_API_URL`              | `http://localhost:3000`   |
    /// | `REELWATCH_API_TOKEN`            | unset                     |
    /// | `REELWATCH_SCOPE`                | `all`                     |
    /// | `REELWATCH_POLL_INTERVAL_MS`     | `3000`                    |
    /// | `REELWATCH_SETTINGS_PATH`        | `reelwatch-settings.json` |
    /// | `REELWATCH_SOUND_COMMAND`        | `paplay <freedesktop complete.oga>` |
    /// | `REELWATCH_PUSH_TOKEN`           | unset                     |
    /// | `REELWATCH_REQUEST_TIMEOUT_SECS` | `10`                      |
    /// | `LOG_FORMAT`                     | `text`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let poll_interval_ms = parse_positive(
            "REELWATCH_POLL_INTERVAL_MS",
            var("REELWATCH_POLL_INTERVAL_MS"),
            DEFAULT_POLL_INTERVAL.as_millis() as u64,
        )?;
        let request_timeout_secs = parse_positive(
            "REELWATCH_REQUEST_TIMEOUT_SECS",
            var("REELWATCH_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?;

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        let sound_command = var("REELWATCH_SOUND_COMMAND")
            .unwrap_or_else(|| DEFAULT_SOUND_COMMAND.into());
        let sound_command = split_words(&sound_command).ok_or_else(|| {
            ConfigError::UnterminatedQuote {
                var: "REELWATCH_SOUND_COMMAND",
                value: sound_command.clone(),
            }
        })?;

        Ok(Self {
            api_url: var("REELWATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            api_token: var("REELWATCH_API_TOKEN"),
            scope: var("REELWATCH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.into()),
            poll_interval: Duration::from_millis(poll_interval_ms),
            settings_path: var("REELWATCH_SETTINGS_PATH")
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.into())
                .into(),
            sound_command,
            push_token: var("REELWATCH_PUSH_TOKEN"),
            request_timeout: Duration::from_secs(request_timeout_secs),
            log_format,
        })
    }
}

fn parse_positive(
    var: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}

/// Split `input` into words on unquoted whitespace.
///
/// Single quotes are literal, double quotes allow `\"` and `\\` escapes,
/// and a backslash outside quotes escapes the next character. `None` on an
/// unterminated quote.
fn split_words(input: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        c => word.push(c),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            c @ ('"' | '\\') => word.push(c),
                            c => {
                                word.push('\\');
                                word.push(c);
                            }
                        },
                        c => word.push(c),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    word.push(c);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Some(words)
}
