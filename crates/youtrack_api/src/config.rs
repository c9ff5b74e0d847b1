use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "youtrack-helper";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Upper bound of issues requested by a single ticket fetch. Larger result
/// sets are not paginated.
pub const DEFAULT_ISSUE_LIMIT: u32 = 5000;
pub const DEFAULT_PROJECT_PAGE_SIZE: u32 = 100;

/// Connection settings for one client instance. Built per call from a
/// candidate or stored base URL and token.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub issue_limit: u32,
    pub project_page_size: u32,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            issue_limit: DEFAULT_ISSUE_LIMIT,
            project_page_size: DEFAULT_PROJECT_PAGE_SIZE,
        }
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn with_issue_limit(mut self, limit: u32) -> Self {
        self.issue_limit = limit.max(1);
        self
    }

    pub fn with_project_page_size(mut self, size: u32) -> Self {
        self.project_page_size = size.max(1);
        self
    }

    /// Normalized base URL with the REST prefix appended, always ending in `/`.
    pub fn api_root(&self) -> String {
        format!("{}/api/", normalize_base_url(&self.base_url))
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("issue_limit", &self.issue_limit)
            .field("project_page_size", &self.project_page_size)
            .finish()
    }
}

/// Trims surrounding whitespace and strips one trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
