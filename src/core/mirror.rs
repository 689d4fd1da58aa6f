use crate::domain::model::SourceDocument;
use crate::utils::error::{ResolveError, Result};
use std::collections::BTreeMap;
use url::Url;

/// Builds the third-party mirror link for a [`SourceDocument`].
#[derive(Debug, Clone)]
pub struct MirrorTemplate {
    base_url: String,
    file_base_url: String,
    tracking_params: BTreeMap<String, String>,
}

impl MirrorTemplate {
    pub fn new(
        base_url: impl Into<String>,
        file_base_url: impl Into<String>,
        tracking_params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            file_base_url: file_base_url.into(),
            tracking_params,
        }
    }

    pub fn build(&self, doc: &SourceDocument) -> Result<Url> {
        // 鏡像站預期 "%2F" 本身再被編碼一次 (=> %252F)
        let file_url = format!("{}{}%2F{}", self.file_base_url, doc.doc_id, doc.title_slug);
        let title_html = format!("<div><p>{}</p></div>", doc.title_slug.replace('-', " "));

        let mut query = format!(
            "fileurl={}&title={}",
            urlencoding::encode(&file_url),
            urlencoding::encode(&title_html)
        );
        for (key, value) in &self.tracking_params {
            query.push('&');
            query.push_str(&urlencoding::encode(key));
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }

        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let link = format!("{}{}{}", self.base_url, separator, query);

        Url::parse(&link).map_err(|e| ResolveError::InvalidConfigValueError {
            field: "mirror_base_url".to_string(),
            value: self.base_url.clone(),
            reason: format!("Cannot build mirror link: {}", e),
        })
    }
}
