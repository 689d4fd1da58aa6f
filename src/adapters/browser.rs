//! Headless Chromium strategy.
//!
//! Loads the mirror page with request interception enabled and watches the
//! network for the viewer URL. Capture and navigation race each other: the
//! first captured link wins even if navigation is still running or failed.

use crate::config::BrowserConfig;
use crate::core::viewer::ViewerMatcher;
use crate::domain::model::ResolvedLink;
use crate::domain::ports::LinkStrategy;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

const NAME: &str = "browser";

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
    "--ignore-certificate-errors",
];

/// Whether an intercepted request should be aborted instead of continued.
pub fn should_block(resource_type: &ResourceType, block_scripts: bool) -> bool {
    match resource_type {
        ResourceType::Image | ResourceType::Stylesheet | ResourceType::Font | ResourceType::Media => {
            true
        }
        ResourceType::Script => block_scripts,
        _ => false,
    }
}

pub struct BrowserStrategy {
    config: BrowserConfig,
    viewer: ViewerMatcher,
}

/// Aborts the listener tasks however `capture` exits.
struct ListenerTasks(Vec<JoinHandle<()>>);

impl Drop for ListenerTasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

impl BrowserStrategy {
    pub fn new(config: BrowserConfig, viewer: ViewerMatcher) -> Self {
        Self { config, viewer }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .request_timeout(self.config.navigation_timeout())
            .args(CHROME_ARGS.iter().copied())
            .args(self.config.extra_args.iter().map(String::as_str));
        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let chrome_config = builder
            .build()
            .map_err(|e| ResolveError::BrowserError {
                message: format!("invalid browser config: {}", e),
            })?;

        tracing::info!("🚀 Launching headless browser");
        let (browser, handler) =
            Browser::launch(chrome_config)
                .await
                .map_err(|e| ResolveError::BrowserError {
                    message: format!("failed to launch browser: {}", e),
                })?;

        let handler_task = tokio::spawn(drive_handler(handler));

        Ok((browser, handler_task))
    }

    async fn capture(&self, browser: &Browser, mirror_url: &Url) -> Result<String> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ResolveError::BrowserError {
                message: format!("failed to open page: {}", e),
            })?;

        let (tx, mut rx) = watch::channel::<Option<String>>(None);
        let tx = Arc::new(tx);
        let page_error = Arc::new(OnceCell::<String>::new());
        let tasks = ListenerTasks(vec![
            self.spawn_interceptor(&page, tx.clone()).await?,
            self.spawn_response_listener(&page, tx.clone()).await?,
            spawn_exception_listener(&page, page_error.clone()).await?,
        ]);

        let interception = FetchEnableParams::builder()
            .pattern(RequestPattern::builder().url_pattern("*").build())
            .build();
        page.execute(interception)
            .await
            .map_err(|e| ResolveError::BrowserError {
                message: format!("failed to enable request interception: {}", e),
            })?;

        let navigation_timeout = self.config.navigation_timeout();
        let post_wait = self.config.post_navigation_wait();
        let navigation = async {
            tracing::debug!("Navigating to {}", mirror_url);
            match tokio::time::timeout(navigation_timeout, page.goto(mirror_url.as_str())).await {
                Err(_) => Err(ResolveError::Timeout {
                    stage: "navigation".to_string(),
                    after: navigation_timeout,
                }),
                Ok(Err(e)) => Err(navigation_error(e, navigation_timeout)),
                Ok(Ok(_)) => {
                    tracing::debug!("Page loaded, waiting {:?} for late requests", post_wait);
                    tokio::time::sleep(post_wait).await;
                    Ok(())
                }
            }
        };
        let captured = async { rx.wait_for(Option::is_some).await.ok().and_then(|v| v.clone()) };

        let outcome = tokio::select! {
            Some(link) = captured => Ok(link),
            result = navigation => {
                let late = tx.borrow().clone();
                match (late, result) {
                    (Some(link), _) => Ok(link),
                    (None, Err(e)) => Err(e),
                    (None, Ok(())) => Err(ResolveError::LinkNotDetected {
                        strategy: NAME.to_string(),
                        detail: match page_error.get() {
                            Some(err) => format!("no viewer request seen; page error: {}", err),
                            None => "no viewer request seen after navigation".to_string(),
                        },
                    }),
                }
            }
        };

        drop(tasks);
        if let Err(e) = page.close().await {
            tracing::debug!("Page close failed: {}", e);
        }
        outcome
    }

    async fn spawn_interceptor(
        &self,
        page: &Page,
        tx: Arc<watch::Sender<Option<String>>>,
    ) -> Result<JoinHandle<()>> {
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(listener_error)?;
        let page = page.clone();
        let viewer = self.viewer.clone();
        let block_scripts = self.config.block_scripts;

        Ok(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                record_capture(&viewer, &tx, &event.request.url);

                let result = if should_block(&event.resource_type, block_scripts) {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = result {
                    tracing::debug!("Interception reply failed for {}: {}", event.request.url, e);
                }
            }
        }))
    }

    async fn spawn_response_listener(
        &self,
        page: &Page,
        tx: Arc<watch::Sender<Option<String>>>,
    ) -> Result<JoinHandle<()>> {
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(listener_error)?;
        let viewer = self.viewer.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                record_capture(&viewer, &tx, &event.response.url);
            }
        }))
    }

    async fn shutdown(mut browser: Browser, handler_task: JoinHandle<()>) {
        shutdown_process(&mut browser).await;
        handler_task.abort();
    }
}

/// The process-control surface `shutdown_process` needs from a launched browser.
#[async_trait]
trait BrowserProcess: Send {
    async fn close(&mut self) -> std::result::Result<(), String>;
    async fn kill(&mut self);
    async fn wait(&mut self) -> std::result::Result<(), String>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn close(&mut self) -> std::result::Result<(), String> {
        Browser::close(self).await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = Browser::kill(self).await {
            tracing::debug!("Killing browser process failed: {}", e);
        }
    }

    async fn wait(&mut self) -> std::result::Result<(), String> {
        Browser::wait(self).await.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Closes the browser, falling back to killing the process. Every step is
/// bounded by `CLOSE_TIMEOUT`. Returns whether the graceful close succeeded.
async fn shutdown_process<P: BrowserProcess>(process: &mut P) -> bool {
    let graceful = match tokio::time::timeout(CLOSE_TIMEOUT, process.close()).await {
        Ok(Ok(())) => {
            tracing::debug!("Browser closed");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!("⚠️ Browser close error: {}", e);
            false
        }
        Err(_) => {
            tracing::warn!("⚠️ Browser close timed out after {:?}", CLOSE_TIMEOUT);
            false
        }
    };

    if !graceful && tokio::time::timeout(CLOSE_TIMEOUT, process.kill()).await.is_err() {
        tracing::warn!("⚠️ Browser kill timed out after {:?}", CLOSE_TIMEOUT);
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, process.wait()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Waiting for browser process failed: {}", e),
        Err(_) => tracing::warn!("⚠️ Browser process still running after {:?}", CLOSE_TIMEOUT),
    }
    graceful
}

async fn spawn_exception_listener(
    page: &Page,
    first_error: Arc<OnceCell<String>>,
) -> Result<JoinHandle<()>> {
    let mut exceptions = page
        .event_listener::<EventExceptionThrown>()
        .await
        .map_err(listener_error)?;

    Ok(tokio::spawn(async move {
        while let Some(event) = exceptions.next().await {
            let text = event.exception_details.text.clone();
            tracing::debug!("Uncaught exception on page: {}", text);
            let _ = first_error.set(text);
        }
    }))
}

fn record_capture(viewer: &ViewerMatcher, tx: &watch::Sender<Option<String>>, raw: &str) {
    let Some(link) = Url::parse(raw).ok().and_then(|url| viewer.extract(&url)) else {
        return;
    };
    tx.send_if_modified(|slot| {
        if slot.is_some() {
            return false;
        }
        tracing::info!("🎯 Captured viewer link from network");
        *slot = Some(link);
        true
    });
}

/// Polls the CDP handler until the connection ends.
// 個別事件解析失敗不代表連線中斷，繼續輪詢
async fn drive_handler<S: Stream + Unpin>(mut handler: S) {
    while handler.next().await.is_some() {}
}

fn navigation_error(e: CdpError, after: Duration) -> ResolveError {
    match e {
        CdpError::Timeout => ResolveError::Timeout {
            stage: "navigation".to_string(),
            after,
        },
        other => ResolveError::BrowserError {
            message: format!("navigation failed: {}", other),
        },
    }
}

fn listener_error(e: CdpError) -> ResolveError {
    ResolveError::BrowserError {
        message: format!("failed to attach page listener: {}", e),
    }
}

#[async_trait]
impl LinkStrategy for BrowserStrategy {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn resolve(&self, mirror_url: &Url) -> Result<ResolvedLink> {
        let (browser, handler_task) = self.launch().await?;
        let outcome = self.capture(&browser, mirror_url).await;
        Self::shutdown(browser, handler_task).await;

        outcome.map(|url| ResolvedLink {
            url,
            strategy: NAME,
        })
    }
}
