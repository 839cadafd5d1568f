//! Cookie stores the session client reads from and writes to.
//!
//! Render paths can only read cookies, so [`ReadOnlyCookies`] swallows writes.
//! Mutating paths use [`ResponseCookies`], which records writes and turns
//! them into `Set-Cookie` headers on the outgoing response.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::Cookie;
use std::{collections::HashMap, convert::Infallible};
use tracing::warn;

pub trait CookieStore {
    fn get(&self, name: &str) -> Option<&str>;

    fn set(&mut self, cookie: Cookie<'static>);
}

/// Cookies sent by the browser, parsed once per request.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    values: HashMap<String, String>,
}

impl RequestCookies {
    /// Parse every `Cookie` header. Malformed pairs are skipped and the first
    /// occurrence of a name wins.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse_encoded(raw).flatten() {
                values
                    .entry(cookie.name().to_string())
                    .or_insert_with(|| cookie.value().to_string());
            }
        }
        Self { values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn record(&mut self, cookie: &Cookie<'_>) {
        if cookie.value().is_empty() {
            self.values.remove(cookie.name());
        } else {
            self.values
                .insert(cookie.name().to_string(), cookie.value().to_string());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOnlyCookies {
    request: RequestCookies,
}

impl ReadOnlyCookies {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            request: RequestCookies::from_headers(headers),
        }
    }
}

impl CookieStore for ReadOnlyCookies {
    fn get(&self, name: &str) -> Option<&str> {
        self.request.get(name)
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        warn!(
            cookie = cookie.name(),
            "cookie write ignored in read-only context"
        );
    }
}

/// Cookie store whose writes end up on the response.
///
/// Reads see earlier writes from the same request, so a session refreshed
/// by the gate is the one handed to later lookups.
#[derive(Debug, Clone, Default)]
pub struct ResponseCookies {
    request: RequestCookies,
    pending: Vec<Cookie<'static>>,
}

impl ResponseCookies {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            request: RequestCookies::from_headers(headers),
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn pending(&self) -> &[Cookie<'static>] {
        &self.pending
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Rewrite the request `Cookie` header so handlers further down see the
    /// cookies as they will be after this response. No-op without writes.
    pub fn forward(&self, request_headers: &mut HeaderMap) {
        if self.pending.is_empty() {
            return;
        }
        let header = self
            .request
            .values
            .iter()
            .map(|(name, value)| Cookie::new(name.as_str(), value.as_str()).encoded().to_string())
            .collect::<Vec<_>>()
            .join("; ");

        request_headers.remove(COOKIE);
        if header.is_empty() {
            return;
        }
        match HeaderValue::from_str(&header) {
            Ok(value) => {
                request_headers.insert(COOKIE, value);
            }
            Err(err) => warn!("failed to rebuild Cookie header: {err}"),
        }
    }

    /// Append one `Set-Cookie` header per recorded write.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for cookie in &self.pending {
            match HeaderValue::from_str(&cookie.encoded().to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => {
                    warn!(cookie = cookie.name(), "failed to encode Set-Cookie header: {err}");
                }
            }
        }
    }
}

impl CookieStore for ResponseCookies {
    fn get(&self, name: &str) -> Option<&str> {
        self.request.get(name)
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        self.request.record(&cookie);
        // A later write for the same cookie replaces the earlier one.
        self.pending.retain(|existing| existing.name() != cookie.name());
        self.pending.push(cookie);
    }
}

impl IntoResponseParts for ResponseCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.apply(res.headers_mut());
        Ok(res)
    }
}
