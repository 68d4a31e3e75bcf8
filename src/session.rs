//! Session cookies carried across the booking flow.
//!
//! The booking site ties every step to the session it issued on the entry
//! page, so each `Set-Cookie` seen in a response is kept and echoed back on the
//! next request. No expiry, path or domain scoping: one flat jar per run.

use cookie_store::RawCookie;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    // first-seen order
    cookies: Vec<(String, String)>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the leading `name=value` of every `Set-Cookie` directive,
    /// overwriting earlier values of the same name.
    pub fn record(&mut self, headers: &HeaderMap) {
        for raw in headers.get_all(header::SET_COOKIE) {
            let Ok(directive) = raw.to_str() else {
                warn!("skipping non-ASCII Set-Cookie header");
                continue;
            };
            if let Some((name, value)) = parse_directive(directive) {
                debug!(cookie = %name, "session cookie updated");
                self.set(name, value);
            }
        }
    }

    /// Inject the held cookies as a single `Cookie` header.
    pub fn attach(&self, headers: &mut HeaderMap) {
        if self.cookies.is_empty() {
            return;
        }
        let line = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&line) {
            Ok(value) => {
                headers.insert(header::COOKIE, value);
            }
            Err(e) => warn!("session cookies not attached: {e}"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn set(&mut self, name: String, value: String) {
        match self.cookies.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.cookies.push((name, value)),
        }
    }
}

/// Leading `name=value` of a `Set-Cookie` directive; attributes are ignored.
fn parse_directive(directive: &str) -> Option<(String, String)> {
    if let Ok(cookie) = RawCookie::parse(directive) {
        let name = cookie.name().trim();
        if name.is_empty() {
            return None;
        }
        return Some((name.to_string(), cookie.value().to_string()));
    }

    // Lenient path for directives the cookie parser refuses.
    let pair = directive.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
