//! Stored login session: a cookie jar exported from a browser or an
//! earlier login, saved as a flat JSON object of cookie name to value.
//!
//! ```json
//! {"sessionid": "...", "csrftoken": "...", "ds_user_id": "..."}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::ScraperError;

const SESSION_COOKIE: &str = "sessionid";
const CSRF_COOKIE: &str = "csrftoken";

#[derive(Clone)]
pub struct Session {
    cookies: BTreeMap<String, String>,
}

impl Session {
    /// Reads a session file.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Session`] if the file cannot be read, is not
    /// a JSON object of strings, or has no `sessionid` cookie.
    pub fn load(path: &Path) -> Result<Self, ScraperError> {
        let session_error = |reason: String| ScraperError::Session {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| session_error(e.to_string()))?;
        let cookies: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| session_error(e.to_string()))?;
        Self::from_cookies(cookies).map_err(|reason| session_error(reason.to_owned()))
    }

    /// # Errors
    ///
    /// Returns a description of the problem if `sessionid` is missing or
    /// blank.
    pub fn from_cookies(cookies: BTreeMap<String, String>) -> Result<Self, &'static str> {
        match cookies.get(SESSION_COOKIE) {
            Some(id) if !id.trim().is_empty() => Ok(Self { cookies }),
            _ => Err("no sessionid cookie"),
        }
    }

    /// `Cookie` header value carrying every stored cookie.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.cookies.get(CSRF_COOKIE).map(String::as_str)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
