use crate::core::viewer::DEFAULT_VIEWER_MARKER;
use crate::domain::model::StrategyKind;
use crate::utils::error::{ResolveError, Result};
use crate::utils::validation::{
    validate_non_empty_list, validate_non_empty_string, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "RESOLVER_CONFIG";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub strategies: Vec<StrategyKind>,
    pub overall_timeout_secs: u64,
    pub mirror: MirrorConfig,
    pub http: HttpConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub base_url: String,
    pub file_base_url: String,
    pub viewer_marker: String,
    pub tracking_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_executable: Option<PathBuf>,
    pub block_scripts: bool,
    pub navigation_timeout_ms: u64,
    /// Falls back to 500ms with scripts blocked and 1500ms otherwise.
    pub post_navigation_wait_ms: Option<u64>,
    pub extra_args: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            overall_timeout_secs: 58,
            mirror: MirrorConfig::default(),
            http: HttpConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let tracking_params = [
            ("utm_source", "scrfree"),
            ("utm_medium", "queue"),
            ("utm_campaign", "dl"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            base_url: "https://ilide.info/docgeneratev2".to_string(),
            file_base_url: "https://scribd.vdownloaders.com/pdownload/".to_string(),
            viewer_marker: DEFAULT_VIEWER_MARKER.to_string(),
            tracking_params,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 20,
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            block_scripts: false,
            navigation_timeout_ms: 55_000,
            post_navigation_wait_ms: None,
            extra_args: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl BrowserConfig {
    pub fn post_navigation_wait(&self) -> Duration {
        let ms = self
            .post_navigation_wait_ms
            .unwrap_or(if self.block_scripts { 500 } else { 1500 });
        Duration::from_millis(ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

#[cfg(feature = "browser")]
fn default_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::Redirect,
        StrategyKind::Html,
        StrategyKind::Browser,
    ]
}

#[cfg(not(feature = "browser"))]
fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::Redirect, StrategyKind::Html]
}

impl ResolverConfig {
    /// 載入配置: 預設值 -> TOML 檔案 (可選) -> 環境變數
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                tracing::info!("📄 Loading resolver config from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${MIRROR_HOST})
    fn substitute_env_vars(content: &str) -> String {
        use once_cell::sync::Lazy;
        use regex::Regex;

        static VAR_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Applies `RESOLVER_*` style overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RESOLVER_MIRROR_BASE_URL") {
            self.mirror.base_url = v;
        }
        if let Some(v) = lookup("RESOLVER_FILE_BASE_URL") {
            self.mirror.file_base_url = v;
        }
        if let Some(v) = lookup("RESOLVER_VIEWER_MARKER") {
            self.mirror.viewer_marker = v;
        }
        if let Some(v) = lookup("RESOLVER_STRATEGIES") {
            self.strategies = StrategyKind::parse_list(&v)?;
        }
        if let Some(v) = lookup("BLOCK_SCRIPTS") {
            self.browser.block_scripts = v == "true";
        }
        if let Some(v) = lookup("RESOLVER_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = parse_number("RESOLVER_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("RESOLVER_NAVIGATION_TIMEOUT_MS") {
            self.browser.navigation_timeout_ms =
                parse_number("RESOLVER_NAVIGATION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("RESOLVER_POST_NAV_WAIT_MS") {
            self.browser.post_navigation_wait_ms =
                Some(parse_number("RESOLVER_POST_NAV_WAIT_MS", &v)?);
        }
        if let Some(v) = lookup("RESOLVER_MAX_REDIRECTS") {
            self.http.max_redirects = parse_number("RESOLVER_MAX_REDIRECTS", &v)?;
        }
        if let Some(v) = lookup("RESOLVER_OVERALL_TIMEOUT_SECS") {
            self.overall_timeout_secs = parse_number("RESOLVER_OVERALL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("RESOLVER_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = lookup("CHROME_PATH") {
            self.browser.chrome_executable = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }

    /// Time the configured chain needs when every strategy runs to its own
    /// timeout once: one request each for `redirect` and `html`, navigation
    /// plus the post-navigation wait for `browser`.
    pub fn strategy_budget(&self) -> Duration {
        self.strategies
            .iter()
            .map(|kind| match kind {
                StrategyKind::Redirect | StrategyKind::Html => self.http.request_timeout(),
                StrategyKind::Browser => {
                    self.browser.navigation_timeout() + self.browser.post_navigation_wait()
                }
            })
            .sum()
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ResolveError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

impl Validate for ResolverConfig {
    fn validate(&self) -> Result<()> {
        // 驗證鏡像站網址
        validate_url("mirror.base_url", &self.mirror.base_url)?;
        validate_url("mirror.file_base_url", &self.mirror.file_base_url)?;
        validate_non_empty_string("mirror.viewer_marker", &self.mirror.viewer_marker)?;

        // 驗證策略
        validate_non_empty_list("strategies", &self.strategies)?;
        if cfg!(not(feature = "browser")) && self.strategies.contains(&StrategyKind::Browser) {
            return Err(ResolveError::InvalidConfigValueError {
                field: "strategies".to_string(),
                value: StrategyKind::Browser.to_string(),
                reason: "built without the `browser` feature".to_string(),
            });
        }

        // 驗證逾時設定
        validate_range("overall_timeout_secs", self.overall_timeout_secs, 1, 900)?;
        validate_range("http.request_timeout_secs", self.http.request_timeout_secs, 1, 300)?;
        validate_range("http.max_redirects", self.http.max_redirects, 0, 30)?;
        validate_range(
            "browser.navigation_timeout_ms",
            self.browser.navigation_timeout_ms,
            1_000,
            600_000,
        )?;
        if let Some(wait) = self.browser.post_navigation_wait_ms {
            validate_range("browser.post_navigation_wait_ms", wait, 0, 60_000)?;
        }

        tracing::debug!("✅ Resolver configuration validation passed");
        Ok(())
    }
}
