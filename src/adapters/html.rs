use crate::adapters::http::{build_client, RedirectMode};
use crate::config::HttpConfig;
use crate::core::viewer::{is_binary_content_type, ViewerMatcher};
use crate::domain::model::ResolvedLink;
use crate::domain::ports::LinkStrategy;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

const NAME: &str = "html";

/// Fetches the mirror page and scrapes the download link out of its HTML.
pub struct HtmlStrategy {
    client: Client,
    viewer: ViewerMatcher,
}

impl HtmlStrategy {
    pub fn new(config: &HttpConfig, viewer: ViewerMatcher) -> Result<Self> {
        Ok(Self {
            client: build_client(config, RedirectMode::Follow)?,
            viewer,
        })
    }
}

#[async_trait]
impl LinkStrategy for HtmlStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(&self, mirror_url: &Url) -> Result<ResolvedLink> {
        tracing::debug!("Fetching mirror page {}", mirror_url);
        let response = self.client.get(mirror_url.clone()).send().await?;
        let final_url = response.url().clone();

        if let Some(link) = self.viewer.extract(&final_url) {
            tracing::info!("🎯 Mirror page redirected to viewer");
            return Ok(ResolvedLink {
                url: link,
                strategy: NAME,
            });
        }

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamStatus {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if final_url != *mirror_url && is_binary_content_type(&content_type) {
            tracing::info!("🎯 Mirror page redirected to a {} file", content_type);
            return Ok(ResolvedLink {
                url: final_url.to_string(),
                strategy: NAME,
            });
        }

        let body = response.text().await?;
        tracing::debug!("Scanning {} bytes of HTML from {}", body.len(), final_url);

        self.viewer
            .scan_html(&body, &final_url)
            .map(|url| {
                tracing::info!("🎯 Found download link in mirror HTML");
                ResolvedLink {
                    url,
                    strategy: NAME,
                }
            })
            .ok_or_else(|| ResolveError::LinkNotDetected {
                strategy: NAME.to_string(),
                detail: format!("no viewer or file link in HTML of {}", final_url),
            })
    }
}
