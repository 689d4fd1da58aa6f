use crate::config::HttpConfig;
use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client};

/// Redirect handling for [`build_client`].
#[derive(Debug, Clone, Copy)]
pub enum RedirectMode {
    /// Hand every 3xx back to the caller.
    Manual,
    /// Let reqwest follow up to `max_redirects` hops.
    Follow,
}

pub fn build_client(config: &HttpConfig, mode: RedirectMode) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let policy = match mode {
        RedirectMode::Manual => redirect::Policy::none(),
        RedirectMode::Follow => redirect::Policy::limited(config.max_redirects),
    };

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .redirect(policy)
        .timeout(config.request_timeout())
        .build()?;
    Ok(client)
}
