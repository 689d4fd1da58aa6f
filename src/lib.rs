pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{handle_request, FunctionResponse};
pub use config::ResolverConfig;
pub use self::core::resolver::{DefaultResolver, LinkResolver};
pub use domain::model::{Resolution, ResolvedLink, SourceDocument, StrategyKind};
pub use domain::ports::LinkStrategy;
pub use utils::error::{ResolveError, Result};
