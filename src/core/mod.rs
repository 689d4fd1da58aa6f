pub mod mirror;
pub mod resolver;
pub mod source;
pub mod viewer;

pub use crate::domain::model::{Resolution, ResolvedLink, SourceDocument, StrategyKind};
pub use crate::domain::ports::LinkStrategy;
pub use crate::utils::error::Result;
