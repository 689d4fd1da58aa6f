// Adapters layer: concrete link strategies against the mirror site.

#[cfg(feature = "browser")]
pub mod browser;
pub mod chain;
pub mod html;
pub mod http;
pub mod redirect;

#[cfg(feature = "browser")]
pub use browser::BrowserStrategy;
pub use chain::StrategyChain;
pub use html::HtmlStrategy;
pub use redirect::RedirectStrategy;
