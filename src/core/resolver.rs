use crate::adapters::{HtmlStrategy, RedirectStrategy, StrategyChain};
use crate::config::ResolverConfig;
use crate::core::mirror::MirrorTemplate;
use crate::core::viewer::ViewerMatcher;
use crate::domain::model::{Resolution, SourceDocument, StrategyKind};
use crate::domain::ports::LinkStrategy;
use crate::utils::error::{ResolveError, Result};
use std::time::Duration;
use url::Url;

/// Source URL -> mirror link -> download link.
pub struct LinkResolver<S: LinkStrategy> {
    template: MirrorTemplate,
    strategy: S,
    timeout: Duration,
}

pub type DefaultResolver = LinkResolver<StrategyChain>;

impl<S: LinkStrategy> LinkResolver<S> {
    pub fn new(template: MirrorTemplate, strategy: S, timeout: Duration) -> Self {
        Self {
            template,
            strategy,
            timeout,
        }
    }

    /// Extracts the document and builds its mirror link without fetching anything.
    pub fn mirror_link(&self, source_url: &str) -> Result<(SourceDocument, Url)> {
        let document = SourceDocument::parse(source_url)?;
        let mirror_url = self.template.build(&document)?;
        tracing::info!("🔗 Mirror link for document {}: {}", document.doc_id, mirror_url);
        Ok((document, mirror_url))
    }

    pub async fn resolve(&self, source_url: &str) -> Result<Resolution> {
        tracing::info!("Resolving download link for {}", source_url);
        let (document, mirror_url) = self.mirror_link(source_url)?;

        let link = tokio::time::timeout(self.timeout, self.strategy.resolve(&mirror_url))
            .await
            .map_err(|_| ResolveError::Timeout {
                stage: "resolution".to_string(),
                after: self.timeout,
            })??;

        tracing::info!("✅ Resolved via {}: {}", link.strategy, link.url);
        Ok(Resolution::new(document, &mirror_url, link))
    }
}

impl LinkResolver<StrategyChain> {
    /// Builds the configured strategy chain.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let viewer = ViewerMatcher::new(config.mirror.viewer_marker.clone());
        let mut strategies: Vec<Box<dyn LinkStrategy>> = Vec::with_capacity(config.strategies.len());

        for kind in &config.strategies {
            match kind {
                StrategyKind::Redirect => {
                    strategies.push(Box::new(RedirectStrategy::new(&config.http, viewer.clone())?))
                }
                StrategyKind::Html => {
                    strategies.push(Box::new(HtmlStrategy::new(&config.http, viewer.clone())?))
                }
                #[cfg(feature = "browser")]
                StrategyKind::Browser => strategies.push(Box::new(
                    crate::adapters::BrowserStrategy::new(config.browser.clone(), viewer.clone()),
                )),
                #[cfg(not(feature = "browser"))]
                StrategyKind::Browser => {
                    return Err(ResolveError::ConfigError {
                        message: "browser strategy requires the `browser` feature".to_string(),
                    })
                }
            }
        }

        let chain = StrategyChain::new(strategies);
        tracing::debug!("Strategy chain: {:?}", chain.names());

        let budget = config.strategy_budget();
        if budget > config.overall_timeout() {
            // 整體逾時先到時，後面的策略只剩下剩餘的時間
            tracing::warn!(
                "⚠️ Strategies may need up to {:?} but the overall timeout is {:?}; later strategies get only what is left",
                budget,
                config.overall_timeout()
            );
        }

        let template = MirrorTemplate::new(
            config.mirror.base_url.clone(),
            config.mirror.file_base_url.clone(),
            config.mirror.tracking_params.clone(),
        );
        Ok(Self::new(template, chain, config.overall_timeout()))
    }
}
