//! Site identity: the key the selector cache is stored under.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Extractor kind used when the caller does not name one.
pub const DEFAULT_EXTRACTOR: &str = "generic";

/// (domain, extractor kind) pair identifying one site layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteIdentity {
    pub domain: String,
    pub extractor: String,
}

impl SiteIdentity {
    #[must_use]
    pub fn new(domain: impl Into<String>, extractor: impl Into<String>) -> Self {
        Self {
            domain: normalize_domain(&domain.into()),
            extractor: extractor.into(),
        }
    }

    /// Identity for the page at `url`.
    ///
    /// The host is lower-cased and a leading `www.` is dropped, so
    /// `https://WWW.Example.com/a` and `http://example.com/b` share a cache
    /// entry. `extractor` defaults to [`DEFAULT_EXTRACTOR`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when `url` does not parse or has no host.
    ///
    /// ```rust
    /// use rs_comment_harvest::SiteIdentity;
    ///
    /// let site = SiteIdentity::from_url("https://www.Example.com/post/1", None)?;
    /// assert_eq!(site.domain, "example.com");
    /// assert_eq!(site.extractor, "generic");
    /// # Ok::<(), rs_comment_harvest::Error>(())
    /// ```
    pub fn from_url(url: &str, extractor: Option<&str>) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("{url}: no host")))?;
        Ok(Self::new(host, extractor.unwrap_or(DEFAULT_EXTRACTOR)))
    }
}

impl fmt::Display for SiteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.extractor)
    }
}

fn normalize_domain(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.strip_prefix("www.").map_or_else(|| host.clone(), str::to_string)
}
