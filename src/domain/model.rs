use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::utils::error::ResolveError;

/// Which source URL pattern produced a [`SourceDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Primary,
    Generic,
}

/// A document identified on the document-sharing site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub doc_id: String,
    pub title: String,
    pub title_slug: String,
    pub matched_by: MatchKind,
}

/// A download link produced by one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub strategy: &'static str,
}

/// Outcome of a full `resolve` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    #[serde(skip)]
    pub document: SourceDocument,
    pub doc_id: String,
    pub mirror_url: String,
    pub download_link: String,
    pub strategy: String,
}

impl Resolution {
    pub fn new(document: SourceDocument, mirror_url: &Url, link: ResolvedLink) -> Self {
        Self {
            doc_id: document.doc_id.clone(),
            document,
            mirror_url: mirror_url.to_string(),
            download_link: link.url,
            strategy: link.strategy.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Redirect,
    Html,
    Browser,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::Html => "html",
            Self::Browser => "browser",
        }
    }

    /// Parses a comma separated list such as `redirect,html`.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ResolveError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redirect" => Ok(Self::Redirect),
            "html" => Ok(Self::Html),
            "browser" | "headless" => Ok(Self::Browser),
            other => Err(ResolveError::InvalidConfigValueError {
                field: "strategies".to_string(),
                value: other.to_string(),
                reason: "expected one of: redirect, html, browser".to_string(),
            }),
        }
    }
}
