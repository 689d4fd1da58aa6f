#[cfg(feature = "cli")]
pub mod cli;
pub mod resolver_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use resolver_config::{BrowserConfig, HttpConfig, MirrorConfig, ResolverConfig};
