use crate::domain::model::{MatchKind, SourceDocument};
use crate::utils::error::{ResolveError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// 支援可選的語系子網域 (de.scribd.com, es.scribd.com ...)
static PRIMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[a-z]{2,3}\.)?scribd\.com/(?:document|doc)/(\d+)/?([^?/#]+)?")
        .expect("primary source pattern is valid")
});

static GENERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[a-z]{2,3}\.)?scribd\.com/.*/(?:document|doc|presentation|book)/(\d+)")
        .expect("generic source pattern is valid")
});

impl SourceDocument {
    /// Extracts the document id and title slug from a document URL.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ResolveError::InvalidSourceUrl {
                url: url.to_string(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if let Some(caps) = PRIMARY_RE.captures(url) {
            let doc_id = caps[1].to_string();
            let title_slug = caps
                .get(2)
                .map(|m| m.as_str().trim_end_matches('/').to_string())
                .filter(|slug| !slug.is_empty())
                .unwrap_or_else(|| format!("document-{}", doc_id));
            let title = title_slug.replace('-', " ");
            tracing::debug!("Extracted via primary pattern: id={}, slug={}", doc_id, title_slug);
            return Ok(Self {
                doc_id,
                title,
                title_slug,
                matched_by: MatchKind::Primary,
            });
        }

        if let Some(caps) = GENERIC_RE.captures(url) {
            let doc_id = caps[1].to_string();
            tracing::warn!("⚠️ Used generic URL matching for {}", url);
            return Ok(Self {
                title_slug: format!("document-{}", doc_id),
                title: format!("Document {}", doc_id),
                doc_id,
                matched_by: MatchKind::Generic,
            });
        }

        tracing::error!("❌ Failed to match document URL format: {}", url);
        Err(ResolveError::InvalidSourceUrl {
            url: url.to_string(),
            reason: "expected scribd.com/document/<id>/<title>".to_string(),
        })
    }
}
