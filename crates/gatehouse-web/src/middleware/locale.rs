//! Locale negotiation stage.
//!
//! Resolution order: URL prefix, then the locale cookie, then
//! `Accept-Language`, then the base locale. A URL prefix is stripped so
//! routes see the clean path (`/de/about` → `/about`). HTML responses get
//! the locale placeholder replaced while streaming.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::uri::PathAndQuery;
use axum::http::{header, Uri};
use axum::response::Response;
use futures::{Stream, StreamExt};
use gatehouse_core::{LocaleSettings, PlaceholderRewriter};

use super::{Middleware, Next};
use crate::auth::extractor::cookie_value;

/// The locale negotiated for the current request.
///
/// Stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale(pub String);

/// Where a request's locale came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleSource {
    /// `/de/about`; the prefix is stripped before routing.
    PathPrefix,
    /// The locale cookie set by the language switcher.
    Cookie,
    AcceptLanguage,
    Base,
}

/// Resolves the locale, strips a locale path prefix and patches HTML responses.
pub struct LocaleMiddleware {
    known: Vec<String>,
    base_locale: String,
    cookie_name: String,
    placeholder: String,
}

impl LocaleMiddleware {
    pub fn from_settings(settings: &LocaleSettings) -> Self {
        Self {
            known: settings.known_locales(),
            base_locale: settings.base_locale.clone(),
            cookie_name: settings.cookie_name.clone(),
            placeholder: settings.placeholder.clone(),
        }
    }

    fn is_known(&self, tag: &str) -> bool {
        self.known.iter().any(|k| k == tag)
    }

    /// `/de/about` gives `("de", "/about")` and `/de` gives `("de", "/")`.
    ///
    /// Only non-base locales count as prefixes: `/en/about` is an ordinary path.
    fn split_locale_prefix<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        let rest = path.strip_prefix('/')?;
        let (segment, tail) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
        if segment == self.base_locale {
            return None;
        }
        let locale = self.known.iter().find(|k| *k == segment)?;
        Some((locale.as_str(), if tail.is_empty() { "/" } else { tail }))
    }

    /// First known tag from an `Accept-Language` header, trying `de-AT` before `de`.
    fn accept_language(&self, header: &str) -> Option<String> {
        language_ranges(header).into_iter().find_map(|tag| {
            if self.is_known(&tag) {
                return Some(tag);
            }
            let (primary, _) = tag.split_once('-')?;
            self.is_known(primary).then(|| primary.to_string())
        })
    }

    fn negotiate(&self, request: &mut Request<Body>) -> (String, LocaleSource) {
        let prefixed = self
            .split_locale_prefix(request.uri().path())
            .map(|(locale, tail)| (locale.to_string(), tail.to_string()));
        if let Some((locale, tail)) = prefixed {
            match rewrite_uri_path(request.uri(), &tail) {
                Ok(uri) => {
                    tracing::debug!(
                        original = %request.uri(),
                        rewritten = %uri,
                        "stripped locale prefix"
                    );
                    *request.uri_mut() = uri;
                }
                Err(e) => tracing::warn!("failed to rewrite localized path: {e}"),
            }
            return (locale, LocaleSource::PathPrefix);
        }

        if let Some(value) = cookie_value(request.headers(), &self.cookie_name) {
            if self.is_known(&value) {
                return (value, LocaleSource::Cookie);
            }
            tracing::debug!(cookie = %value, "ignoring unknown locale cookie");
        }

        let from_header = request
            .headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| self.accept_language(h));
        match from_header {
            Some(locale) => (locale, LocaleSource::AcceptLanguage),
            None => (self.base_locale.clone(), LocaleSource::Base),
        }
    }
}

/// Lowercased language tags by descending `q`, ties in header order.
/// Tags with `q=0` are refused by the client and dropped.
fn language_ranges(header: &str) -> Vec<String> {
    let mut ranges: Vec<(f32, String)> = Vec::new();
    for item in header.split(',') {
        let mut params = item.split(';').map(str::trim);
        let tag = match params.next() {
            Some(tag) if !tag.is_empty() => tag.to_ascii_lowercase(),
            _ => continue,
        };
        let q = params
            .filter_map(|p| p.strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .map_or(1.0, |q| q.clamp(0.0, 1.0));
        if q > 0.0 {
            ranges.push((q, tag));
        }
    }
    ranges.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranges.into_iter().map(|(_, tag)| tag).collect()
}

#[async_trait]
impl Middleware for LocaleMiddleware {
    async fn handle(&self, mut request: Request<Body>, next: Next<'_>) -> Response {
        let (locale, source) = self.negotiate(&mut request);
        tracing::trace!(%locale, ?source, "locale resolved");
        request
            .extensions_mut()
            .insert(ResolvedLocale(locale.clone()));

        let response = next.run(request).await;
        localize_html(response, &self.placeholder, &locale)
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
}

/// Rewrites the placeholder in an HTML body chunk by chunk. Other bodies pass through.
fn localize_html(response: Response, placeholder: &str, locale: &str) -> Response {
    if !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let rewriter = PlaceholderRewriter::new(placeholder, locale);
    Response::from_parts(parts, Body::from_stream(rewrite_body(body, rewriter)))
}

fn rewrite_body(
    body: Body,
    rewriter: PlaceholderRewriter,
) -> impl Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
    let chunks = body.into_data_stream();
    futures::stream::unfold(Some((chunks, rewriter)), |state| async move {
        let (mut chunks, mut rewriter) = state?;
        match chunks.next().await {
            Some(Ok(chunk)) => {
                let out = Bytes::from(rewriter.push(&chunk));
                Some((Ok(out), Some((chunks, rewriter))))
            }
            Some(Err(e)) => Some((Err(e), None)),
            None => {
                let tail = rewriter.finish();
                if tail.is_empty() {
                    None
                } else {
                    Some((Ok(Bytes::from(tail)), None))
                }
            }
        }
    })
}

/// Replaces the path of `original`; the query and authority are kept.
fn rewrite_uri_path(original: &Uri, new_path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match original.query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_string(),
    };
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>()?);
    Ok(Uri::from_parts(parts)?)
}
