use crate::config::ResolverConfig;
use crate::domain::model::StrategyKind;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "doclink-resolver")]
#[command(about = "Resolve a document page URL to a direct download link through a mirror site")]
pub struct CliConfig {
    /// Document page URL, e.g. https://www.scribd.com/document/123/Title
    pub source_url: String,

    #[arg(long, help = "TOML config file (defaults to $RESOLVER_CONFIG)")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, value_delimiter = ',', help = "Strategies to try, in order")]
    pub strategy: Vec<StrategyKind>,

    #[arg(long, help = "Abort script requests in the headless browser")]
    pub block_scripts: bool,

    #[arg(long)]
    pub navigation_timeout_ms: Option<u64>,

    #[arg(long, help = "Print the generated mirror link without fetching it")]
    pub mirror_only: bool,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the resolver config and applies command line overrides on top.
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ResolverConfig) {
        if !self.strategy.is_empty() {
            config.strategies = self.strategy.clone();
        }
        if self.block_scripts {
            config.browser.block_scripts = true;
        }
        if let Some(ms) = self.navigation_timeout_ms {
            config.browser.navigation_timeout_ms = ms;
        }
    }
}
