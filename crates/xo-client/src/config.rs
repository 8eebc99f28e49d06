//! Client configuration.
//!
//! [`RawConfig`] holds unvalidated, all-optional settings as they arrive from
//! flags or the environment; [`RawConfig::validate`] turns them into a
//! [`ClientConfig`] or a [`ConfigError`] naming the offending field.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::duration::parse_duration;
use crate::error::ConfigError;

/// Environment variable holding the server URL.
pub const ENV_URL: &str = "XOA_URL";
/// Environment variable holding the username.
pub const ENV_USER: &str = "XOA_USER";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "XOA_PASSWORD";
/// Environment variable holding an authentication token.
pub const ENV_TOKEN: &str = "XOA_TOKEN";
/// Environment variable disabling TLS verification.
pub const ENV_INSECURE: &str = "XOA_INSECURE";
/// Environment variable selecting the retry mode.
pub const ENV_RETRY_MODE: &str = "XOA_RETRY_MODE";
/// Environment variable bounding total retry time.
pub const ENV_RETRY_MAX_TIME: &str = "XOA_RETRY_MAX_TIME";
/// Environment variable bounding each request.
pub const ENV_REQUEST_TIMEOUT: &str = "XOA_REQUEST_TIMEOUT";

const DEFAULT_RETRY_MAX_TIME: Duration = Duration::from_secs(300);

/// How to authenticate the session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `session.signInWithPassword`.
    Password {
        /// Login, sent as `email`.
        username: String,
        /// Password.
        password: String,
    },
    /// `session.signInWithToken`.
    Token(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Behaviour of a call that fails with a transient transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryMode {
    /// Fail immediately.
    #[default]
    None,
    /// Reconnect and retry with exponential backoff.
    Backoff,
}

impl RetryMode {
    /// Configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Backoff => "backoff",
        }
    }
}

impl fmt::Display for RetryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "backoff" => Ok(Self::Backoff),
            other => Err(ConfigError::new(
                "retry_mode",
                format!("expected `none` or `backoff`, got `{other}`"),
            )),
        }
    }
}

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Websocket endpoint, already ending in `/api/`.
    pub endpoint: Url,
    /// Session credentials.
    pub credentials: Credentials,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Retry behaviour for transient failures.
    pub retry_mode: RetryMode,
    /// Upper bound on total time spent retrying one call.
    pub retry_max_time: Duration,
    /// Per-request response deadline.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Build a password-authenticated configuration with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL is unusable.
    pub fn with_password(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        RawConfig {
            url: Some(url.to_string()),
            username: Some(username.into()),
            password: Some(password.into()),
            ..RawConfig::default()
        }
        .validate()
    }

    /// Build a token-authenticated configuration with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL is unusable.
    pub fn with_token(url: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        RawConfig {
            url: Some(url.to_string()),
            token: Some(token.into()),
            ..RawConfig::default()
        }
        .validate()
    }

    /// Read and validate the `XOA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        RawConfig::from_lookup(|key| std::env::var(key).ok())?.validate()
    }

    /// Set the retry mode.
    #[must_use]
    pub const fn retry_mode(mut self, mode: RetryMode) -> Self {
        self.retry_mode = mode;
        self
    }

    /// Set the retry time bound.
    #[must_use]
    pub const fn retry_max_time(mut self, max: Duration) -> Self {
        self.retry_max_time = max;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Toggle TLS verification.
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Unvalidated settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    /// Server URL (`ws`, `wss`, `http` or `https`).
    pub url: Option<String>,
    /// Login.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Authentication token.
    pub token: Option<String>,
    /// Skip TLS verification.
    pub insecure: Option<bool>,
    /// `none` or `backoff`.
    pub retry_mode: Option<String>,
    /// Go-style duration.
    pub retry_max_time: Option<String>,
    /// Go-style duration.
    pub request_timeout: Option<String>,
}

impl RawConfig {
    /// Collect settings from a key lookup, typically the process environment.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `XOA_INSECURE` is not a boolean.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let insecure = get(ENV_INSECURE).map(|v| parse_bool(&v)).transpose()?;
        Ok(Self {
            url: get(ENV_URL),
            username: get(ENV_USER),
            password: get(ENV_PASSWORD),
            token: get(ENV_TOKEN),
            insecure,
            retry_mode: get(ENV_RETRY_MODE),
            retry_max_time: get(ENV_RETRY_MAX_TIME),
            request_timeout: get(ENV_REQUEST_TIMEOUT),
        })
    }

    /// Overlay `other` on top of `self`; set fields in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            url: other.url.or(self.url),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            token: other.token.or(self.token),
            insecure: other.insecure.or(self.insecure),
            retry_mode: other.retry_mode.or(self.retry_mode),
            retry_max_time: other.retry_max_time.or(self.retry_max_time),
            request_timeout: other.request_timeout.or(self.request_timeout),
        }
    }

    /// Validate into a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid field.
    pub fn validate(self) -> Result<ClientConfig, ConfigError> {
        let url = self
            .url
            .ok_or_else(|| ConfigError::new("url", "required"))?;
        let endpoint = endpoint(&url)?;

        let credentials = match (self.username, self.password, self.token) {
            (None, None, Some(token)) => Credentials::Token(token),
            (Some(username), Some(password), None) => Credentials::Password { username, password },
            (Some(_), None, None) => {
                return Err(ConfigError::new("password", "required when username is set"));
            }
            (None, Some(_), None) => {
                return Err(ConfigError::new("username", "required when password is set"));
            }
            (None, None, None) => {
                return Err(ConfigError::new(
                    "credentials",
                    "set username and password, or token",
                ));
            }
            (_, _, Some(_)) => {
                return Err(ConfigError::new(
                    "token",
                    "cannot be combined with username/password",
                ));
            }
        };

        let retry_mode = self
            .retry_mode
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        let retry_max_time = self
            .retry_max_time
            .as_deref()
            .map(|s| positive_duration("retry_max_time", s))
            .transpose()?
            .unwrap_or(DEFAULT_RETRY_MAX_TIME);

        let request_timeout = self
            .request_timeout
            .as_deref()
            .map(|s| positive_duration("request_timeout", s))
            .transpose()?;

        Ok(ClientConfig {
            endpoint,
            credentials,
            insecure: self.insecure.unwrap_or(false),
            retry_mode,
            retry_max_time,
            request_timeout,
        })
    }
}

/// Map `url` to the websocket endpoint `<url>/api/`.
fn endpoint(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| ConfigError::new("url", e.to_string()))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(ConfigError::new(
                "url",
                format!("unsupported scheme `{other}`, expected ws or wss"),
            ));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ConfigError::new("url", format!("cannot use scheme `{scheme}`")))?;

    let base = url.path().trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    let path = format!("{base}/api/");
    url.set_path(&path);
    Ok(url)
}

fn positive_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = parse_duration(raw).map_err(|e| ConfigError::new(field, e.to_string()))?;
    if duration.is_zero() {
        return Err(ConfigError::new(field, "must be positive"));
    }
    Ok(duration)
}

fn parse_bool(raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::new(
            "insecure",
            format!("expected a boolean, got `{raw}`"),
        )),
    }
}
