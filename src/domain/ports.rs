use crate::domain::model::ResolvedLink;
use crate::utils::error::Result;
use async_trait::async_trait;
use url::Url;

/// One technique for turning a mirror link into a download link.
#[async_trait]
pub trait LinkStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, mirror_url: &Url) -> Result<ResolvedLink>;
}

