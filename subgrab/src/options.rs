//! Extraction options.

use std::sync::Arc;

use crate::fetch::Fetch;

/// Options for [`extract_subtitles`](crate::extract_subtitles).
///
/// ```no_run
/// use subgrab::ExtractOptions;
///
/// let options = ExtractOptions::new()
///     .languages(["eng", "jpn"])
///     .concurrency(4)
///     .header("Authorization", "Bearer token");
/// ```
#[derive(Clone, Default)]
pub struct ExtractOptions {
    pub(crate) allow_full_download: bool,
    pub(crate) languages: Option<Vec<String>>,
    pub(crate) fetch: Option<Arc<dyn Fetch>>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) concurrency: usize,
}

impl ExtractOptions {
    /// Create options with defaults: Range required, all languages, the
    /// built-in HTTP client, no extra headers, sequential fetching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit an in-memory full download when the server ignores Range
    /// requests. Default: off.
    pub fn allow_full_download(mut self, allow: bool) -> Self {
        self.allow_full_download = allow;
        self
    }

    /// Keep only tracks whose language is in this whitelist. Matching is
    /// case-insensitive, and tracks without a language never match.
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    /// Inject an HTTP client. Defaults to [`ReqwestFetch`](crate::ReqwestFetch).
    pub fn fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Add a header to every request. The `Range` header is always
    /// controlled by the reader and cannot be overridden here.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Worker-pool size for targeted block fetches. Default 1 (sequential).
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub(crate) fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractOptions::new();
        assert!(!options.allow_full_download);
        assert!(options.languages.is_none());
        assert!(options.fetch.is_none());
        assert!(options.headers.is_empty());
        assert_eq!(options.effective_concurrency(), 1);
    }

    #[test]
    fn test_builder() {
        let options = ExtractOptions::new()
            .allow_full_download(true)
            .languages(["ENG", "spa"])
            .header("X-Test", "1")
            .concurrency(8);
        assert!(options.allow_full_download);
        assert_eq!(options.languages.as_deref(), Some(&["ENG".to_string(), "spa".to_string()][..]));
        assert_eq!(options.headers.len(), 1);
        assert_eq!(options.effective_concurrency(), 8);
    }

    #[test]
    fn test_concurrency_floor() {
        let options = ExtractOptions::new().concurrency(0);
        assert_eq!(options.effective_concurrency(), 1);
    }
}
