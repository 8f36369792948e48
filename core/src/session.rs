//! Cookie session established by the login exchange.
//!
//! # Design
//! The session belongs to the transport: it absorbs `Set-Cookie` headers from
//! every response and resends the cookies on every request. The client never
//! looks inside it. Persisting it between runs goes through a `SessionStore`
//! chosen by the caller; `FileSessionStore` keeps it as JSON on disk and
//! assumes it is the only writer of that file.
//!
//! Each cookie keeps the expiry given by `Max-Age` or `Expires`. An expired
//! cookie is never resent, and a loaded session starts without them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionStoreError;

/// `Expires` date layouts seen in the wild: IMF-fixdate, the Netscape form
/// with dashes, and RFC 850 with a two-digit year.
const EXPIRES_FORMATS: [&str; 3] = [
    "%a, %d %b %Y %H:%M:%S GMT",
    "%a, %d-%b-%Y %H:%M:%S GMT",
    "%A, %d-%b-%y %H:%M:%S GMT",
];

/// One cookie value with its expiry; `None` lives for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|at| at > now)
    }
}

/// Cookies issued by the server, keyed by name.
///
/// `Domain` and `Path` are not tracked: a session belongs to one transport,
/// which talks to a single base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    cookies: BTreeMap<String, StoredCookie>,
}

impl Session {
    /// True when no unexpired cookie is left.
    pub fn is_empty(&self) -> bool {
        let now = Utc::now();
        !self.cookies.values().any(|c| c.is_live(now))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| c.is_live(Utc::now()))
            .map(|c| c.value.as_str())
    }

    /// Value for a `Cookie` request header, or `None` with no live cookies.
    pub fn cookie_header(&self) -> Option<String> {
        let now = Utc::now();
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|(_, c)| c.is_live(now))
            .map(|(name, c)| format!("{name}={}", c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Applies one `Set-Cookie` header value. Returns whether anything changed.
    pub fn absorb_set_cookie(&mut self, header: &str) -> bool {
        self.absorb_set_cookie_at(header, Utc::now())
    }

    /// Same as `absorb_set_cookie` with an explicit clock. `Max-Age` wins over
    /// `Expires`; an unparseable `Expires` is ignored.
    pub fn absorb_set_cookie_at(&mut self, header: &str, now: DateTime<Utc>) -> bool {
        let mut parts = header.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let mut max_age = None;
        let mut expires = None;
        for attr in parts {
            let Some((key, raw)) = attr.split_once('=') else {
                continue;
            };
            let raw = raw.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "max-age" => max_age = raw.parse::<i64>().ok(),
                "expires" => expires = parse_expires(raw),
                _ => {}
            }
        }
        let expires = match max_age {
            Some(secs) if secs <= 0 => Some(now),
            Some(secs) => Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d)),
            None => expires,
        };

        let cookie = StoredCookie {
            value: value.trim().to_string(),
            expires,
        };
        if !cookie.is_live(now) {
            return self.cookies.remove(name).is_some();
        }
        self.cookies.insert(name.to_string(), cookie.clone()) != Some(cookie)
    }

    /// Drops every cookie that has expired by `now`. Returns whether any was dropped.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|_, c| c.is_live(now));
        self.cookies.len() != before
    }
}

fn parse_expires(raw: &str) -> Option<DateTime<Utc>> {
    EXPIRES_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Somewhere a session survives between client instances.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError>;
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;
}

/// Stores the session as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut session: Session =
            serde_json::from_str(&raw).map_err(|source| SessionStoreError::Decode {
                path: self.path.clone(),
                source,
            })?;
        session.remove_expired(Utc::now());
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let raw = serde_json::to_string_pretty(session).map_err(SessionStoreError::Encode)?;
        fs::write(&self.path, raw).map_err(|source| SessionStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
