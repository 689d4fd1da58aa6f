use crate::adapters::http::{build_client, RedirectMode};
use crate::config::HttpConfig;
use crate::core::viewer::{is_binary_content_type, ViewerMatcher};
use crate::domain::model::ResolvedLink;
use crate::domain::ports::LinkStrategy;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Client;
use url::Url;

const NAME: &str = "redirect";

/// Follows the mirror's redirect chain by hand and captures the viewer hop.
pub struct RedirectStrategy {
    client: Client,
    viewer: ViewerMatcher,
    max_redirects: usize,
}

impl RedirectStrategy {
    pub fn new(config: &HttpConfig, viewer: ViewerMatcher) -> Result<Self> {
        Ok(Self {
            client: build_client(config, RedirectMode::Manual)?,
            viewer,
            max_redirects: config.max_redirects,
        })
    }

    fn not_detected(detail: String) -> ResolveError {
        ResolveError::LinkNotDetected {
            strategy: NAME.to_string(),
            detail,
        }
    }
}

#[async_trait]
impl LinkStrategy for RedirectStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(&self, mirror_url: &Url) -> Result<ResolvedLink> {
        let mut current = mirror_url.clone();

        for hop in 0..=self.max_redirects {
            if let Some(link) = self.viewer.extract(&current) {
                tracing::info!("🎯 Captured viewer link after {} redirect(s)", hop);
                return Ok(ResolvedLink {
                    url: link,
                    strategy: NAME,
                });
            }

            tracing::debug!("Redirect hop {}: GET {}", hop, current);
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        Self::not_detected(format!("{} from {} without Location", status, current))
                    })?;
                current = current.join(location).map_err(|e| {
                    Self::not_detected(format!("unusable Location '{}': {}", location, e))
                })?;
                continue;
            }

            if !status.is_success() {
                return Err(ResolveError::UpstreamStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if hop > 0 && is_binary_content_type(content_type) {
                tracing::info!("🎯 Redirect chain ended at a {} response", content_type);
                return Ok(ResolvedLink {
                    url: current.to_string(),
                    strategy: NAME,
                });
            }

            return Err(Self::not_detected(format!(
                "redirect chain ended at {} ({}) without a viewer link",
                current, status
            )));
        }

        Err(Self::not_detected(format!(
            "more than {} redirects",
            self.max_redirects
        )))
    }
}
