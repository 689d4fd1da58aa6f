//! Recognizes the mirror's document viewer URL and pulls the real download
//! link out of its `file` parameter.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

pub const DEFAULT_VIEWER_MARKER: &str = "viewer/web/viewer.html";

const FILE_PARAM: &str = "file";

const BINARY_EXTENSIONS: &[&str] = &[".pdf", ".epub", ".djvu", ".zip"];

const BINARY_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/octet-stream",
    "application/epub+zip",
    "application/zip",
];

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:href|src|action|data-src|content)\s*=\s*["']([^"']+)["']"#)
        .expect("attribute pattern is valid")
});

static SCRIPT_NAV_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"location(?:\.href)?\s*=\s*["']([^"']+)["']|location\.(?:assign|replace)\(\s*["']([^"']+)["']"#,
    )
    .expect("script navigation pattern is valid")
});

static META_REFRESH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\burl\s*=\s*['"]?([^'">\s]+)"#).expect("meta refresh pattern is valid")
});

static BARE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:https?://|/)[^\s"'<>()]+"#).expect("bare url pattern is valid")
});

#[derive(Debug, Clone)]
pub struct ViewerMatcher {
    marker: String,
}

impl Default for ViewerMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWER_MARKER)
    }
}

impl ViewerMatcher {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Returns the decoded `file` parameter when `url` is a viewer URL.
    pub fn extract(&self, url: &Url) -> Option<String> {
        if !url.as_str().contains(&self.marker) {
            return None;
        }

        let file = url
            .query_pairs()
            .find(|(key, _)| key == FILE_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.trim().is_empty())?;

        // 查詢字串解析後必須再解碼一次，失敗就不算擷取
        let once = urlencoding::decode(&file).ok()?.into_owned();
        // 鏡像站有時會再多編碼一層
        let decoded = match urlencoding::decode(&once) {
            Ok(twice) => twice.into_owned(),
            Err(_) => once.clone(),
        };

        match Url::parse(&decoded) {
            Ok(absolute) => Some(absolute.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                url.join(&decoded).ok().map(|u| u.to_string())
            }
            Err(_) => Some(decoded),
        }
    }

    /// Like [`extract`](Self::extract) but for raw strings, optionally relative to `base`.
    pub fn extract_str(&self, raw: &str, base: Option<&Url>) -> Option<String> {
        if !raw.contains(&self.marker) {
            return None;
        }
        let raw = unescape_amp(raw);
        let url = match base {
            Some(base) => base.join(&raw).ok()?,
            None => Url::parse(&raw).ok()?,
        };
        self.extract(&url)
    }

    /// Searches an HTML document for a viewer link, then for a direct binary link.
    pub fn scan_html(&self, html: &str, base: &Url) -> Option<String> {
        let attributes = ATTRIBUTE_RE.captures_iter(html).filter_map(|c| c.get(1));
        let scripts = SCRIPT_NAV_RE
            .captures_iter(html)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)));
        let refreshes = META_REFRESH_RE.captures_iter(html).filter_map(|c| c.get(1));
        let bare = BARE_URL_RE.find_iter(html);

        let candidates: Vec<&str> = attributes
            .chain(scripts)
            .chain(refreshes)
            .chain(bare)
            .map(|m| m.as_str())
            .collect();

        if let Some(link) = candidates
            .iter()
            .find_map(|candidate| self.extract_str(candidate, Some(base)))
        {
            return Some(link);
        }

        candidates
            .iter()
            .filter_map(|candidate| base.join(&unescape_amp(candidate)).ok())
            .find(|url| is_binary_path(url) && url != base)
            .map(|url| url.to_string())
    }
}

pub fn is_binary_path(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub fn is_binary_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    BINARY_CONTENT_TYPES.contains(&mime.as_str())
}

fn unescape_amp(raw: &str) -> String {
    raw.replace("&amp;", "&")
}
