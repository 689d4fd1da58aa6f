use crate::domain::model::ResolvedLink;
use crate::domain::ports::LinkStrategy;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use std::time::Instant;
use url::Url;

/// Runs strategies in order until one produces a link.
///
/// A failure moves on to the next strategy only when
/// [`ResolveError::allows_fallback`] says so; input and configuration
/// errors end the chain immediately.
pub struct StrategyChain {
    strategies: Vec<Box<dyn LinkStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn LinkStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

}

#[async_trait]
impl LinkStrategy for StrategyChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn resolve(&self, mirror_url: &Url) -> Result<ResolvedLink> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut last_error = None;

        for strategy in &self.strategies {
            let started = Instant::now();
            tracing::info!("🔍 Trying {} strategy", strategy.name());

            match strategy.resolve(mirror_url).await {
                Ok(link) => {
                    tracing::info!(
                        "✅ {} strategy succeeded in {:?}",
                        strategy.name(),
                        started.elapsed()
                    );
                    return Ok(link);
                }
                Err(e) if e.allows_fallback() => {
                    tracing::warn!(
                        "⚠️ {} strategy failed after {:?}: {}",
                        strategy.name(),
                        started.elapsed(),
                        e
                    );
                    attempts.push(format!("{}: {}", strategy.name(), e));
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(last) => Err(ResolveError::AllStrategiesFailed {
                attempts,
                last: Box::new(last),
            }),
            None => Err(ResolveError::ConfigError {
                message: "no strategies configured".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Scripted {
        name: &'static str,
        outcome: fn() -> Result<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LinkStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(&self, _mirror_url: &Url) -> Result<ResolvedLink> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)().map(|url| ResolvedLink {
                url,
                strategy: self.name,
            })
        }
    }

    fn scripted(
        name: &'static str,
        outcome: fn() -> Result<String>,
    ) -> (Box<dyn LinkStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Scripted {
            name,
            outcome,
            calls: calls.clone(),
        };
        (Box::new(strategy), calls)
    }

    fn not_detected() -> Result<String> {
        Err(ResolveError::LinkNotDetected {
            strategy: "redirect".to_string(),
            detail: "no viewer hop".to_string(),
        })
    }

    fn timed_out() -> Result<String> {
        Err(ResolveError::Timeout {
            stage: "navigation".to_string(),
            after: Duration::from_millis(10),
        })
    }

    fn found() -> Result<String> {
        Ok("https://cdn.example.com/doc.pdf".to_string())
    }

    fn bad_config() -> Result<String> {
        Err(ResolveError::ConfigError {
            message: "broken".to_string(),
        })
    }

    fn mirror() -> Url {
        Url::parse("https://mirror.example.com/gen?fileurl=x").unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_to_next_strategy() {
        let (first, first_calls) = scripted("redirect", not_detected);
        let (second, second_calls) = scripted("html", found);
        let chain = StrategyChain::new(vec![first, second]);

        let link = chain.resolve(&mirror()).await.unwrap();
        assert_eq!(link.strategy, "html");
        assert_eq!(link.url, "https://cdn.example.com/doc.pdf");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let (first, _) = scripted("redirect", found);
        let (second, second_calls) = scripted("html", not_detected);
        let chain = StrategyChain::new(vec![first, second]);

        let link = chain.resolve(&mirror()).await.unwrap();
        assert_eq!(link.strategy, "redirect");
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failed_reports_every_attempt() {
        let (first, _) = scripted("redirect", not_detected);
        let (second, _) = scripted("browser", timed_out);
        let chain = StrategyChain::new(vec![first, second]);

        let err = chain.resolve(&mirror()).await.unwrap_err();
        match &err {
            ResolveError::AllStrategiesFailed { attempts, .. } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("redirect:"));
                assert!(attempts[1].starts_with("browser:"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.status_code(), 504);
    }

    #[tokio::test]
    async fn test_non_fallback_error_ends_chain() {
        let (first, _) = scripted("redirect", bad_config);
        let (second, second_calls) = scripted("html", found);
        let chain = StrategyChain::new(vec![first, second]);

        let err = chain.resolve(&mirror()).await.unwrap_err();
        assert!(matches!(err, ResolveError::ConfigError { .. }));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = StrategyChain::new(Vec::new());
        assert!(chain.names().is_empty());
        tokio_test::assert_err!(chain.resolve(&mirror()).await);
    }
}
