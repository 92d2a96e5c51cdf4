use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Credentials collected by the login flow.
///
/// No client-side validation happens here; empty strings are legal and the
/// engine decides whether they are acceptable.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
    pub repository: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            repository: repository.into(),
        }
    }
}

// The secret never reaches logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("repository", &self.repository)
            .finish()
    }
}

/// Errors from parsing a repository locator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("invalid char")]
    InvalidChar,

    #[error("empty REPO")]
    EmptyGroup,

    #[error("empty USER")]
    EmptyUser,

    #[error("empty HOST:PORT")]
    EmptyHostPort,

    #[error("wrong HOST:PORT")]
    WrongHostPort,

    #[error("empty HOST")]
    EmptyHost,

    #[error("empty PORT")]
    EmptyPort,

    #[error("invalid PORT")]
    InvalidPort,

    #[error("PORT out of range")]
    PortOutOfRange,
}

/// Parsed form of `[USER@][HOST:PORT/]GROUP`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryLocator {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub group: String,
}

fn locator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?P<user>[^@/]*)@)?(?P<hostport>[^/]*)/(?P<group>.*)$")
            .expect("Invalid locator regex")
    })
}

impl RepositoryLocator {
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let trimmed = raw.trim();
        if trimmed.chars().any(char::is_whitespace) {
            return Err(LocatorError::InvalidChar);
        }

        if !trimmed.contains('/') {
            if trimmed.is_empty() {
                return Err(LocatorError::EmptyGroup);
            }
            return Ok(Self {
                group: trimmed.to_string(),
                ..Self::default()
            });
        }

        let caps = locator_pattern()
            .captures(trimmed)
            .ok_or(LocatorError::WrongHostPort)?;
        let group = caps.name("group").map_or("", |m| m.as_str());
        if group.is_empty() {
            return Err(LocatorError::EmptyGroup);
        }
        let hostport = caps.name("hostport").map_or("", |m| m.as_str());

        let user = match caps.name("user") {
            Some(m) if m.as_str().is_empty() => return Err(LocatorError::EmptyUser),
            Some(m) => Some(m.as_str().to_string()),
            None => None,
        };

        if hostport.is_empty() {
            if user.is_none() {
                return Err(LocatorError::EmptyHostPort);
            }
            return Ok(Self {
                user,
                group: group.to_string(),
                ..Self::default()
            });
        }

        let (host, port) = hostport
            .rsplit_once(':')
            .ok_or(LocatorError::WrongHostPort)?;
        if host.is_empty() {
            return Err(LocatorError::EmptyHost);
        }
        if port.is_empty() {
            return Err(LocatorError::EmptyPort);
        }
        let port: u16 = port.parse().map_err(|_| LocatorError::InvalidPort)?;
        if port == 0 {
            return Err(LocatorError::PortOutOfRange);
        }

        Ok(Self {
            user,
            host: Some(host.to_string()),
            port: Some(port),
            group: group.to_string(),
        })
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        match (&self.host, self.port) {
            (Some(host), Some(port)) => write!(f, "{host}:{port}/{}", self.group),
            _ if self.user.is_some() => write!(f, "/{}", self.group),
            _ => write!(f, "{}", self.group),
        }
    }
}
