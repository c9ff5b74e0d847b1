use crate::config::{normalize_base_url, ApiConfig};
use crate::error::{ApiError, Result};
use crate::models::{Project, RawIssue, Ticket, UserProfile};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

const ISSUE_FIELDS: &str = "idReadable,summary,customFields(name,value(name))";
const PROJECT_FIELDS: &str = "id,name,shortName,archived";
const USER_FIELDS: &str = "id,name,email";
const MAX_PROJECT_PAGES: u32 = 100;

/// HTTP client bound to one base URL and token. Cheap to build, so callers
/// construct one per operation instead of sharing ambient state.
#[derive(Clone)]
pub struct YouTrackClient {
    http: HttpClient,
    config: ApiConfig,
    base_url: String,
}

impl YouTrackClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let base_url = validate_base_url(&config.base_url)?;
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Normalized base URL used for requests and ticket links.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Minimal authenticated read; succeeds only if the token is accepted.
    pub async fn validate_connection(&self) -> Result<()> {
        let url = self.url_for("users/me");
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "id")])
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, &url).await)
        }
    }

    pub async fn fetch_current_user(&self) -> Result<UserProfile> {
        self.get_json("users/me", &[("fields", USER_FIELDS.to_string())])
            .await
    }

    /// Lists every project visible to the token, following `$skip`/`$top`
    /// paging until a short page comes back.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let page_size = self.config.project_page_size.max(1);
        let mut projects = Vec::new();
        let mut skip = 0u32;

        for _ in 0..MAX_PROJECT_PAGES {
            let page: Vec<Project> = self
                .get_json(
                    "admin/projects",
                    &[
                        ("fields", PROJECT_FIELDS.to_string()),
                        ("$skip", skip.to_string()),
                        ("$top", page_size.to_string()),
                    ],
                )
                .await?;
            let count = page.len();
            projects.extend(page);
            if count < page_size as usize {
                return Ok(projects);
            }
            skip = skip.saturating_add(page_size);
        }

        Err(ApiError::InvalidResponse(format!(
            "project listing did not terminate after {MAX_PROJECT_PAGES} pages"
        )))
    }

    /// Fetches every issue in `project_keys` and normalizes it into tickets.
    ///
    /// Fails with [`ApiError::NotConfigured`] before any network activity when
    /// no usable project key is given. At most `issue_limit` issues are
    /// requested; a full page is logged as a possible truncation.
    pub async fn fetch_tickets(&self, project_keys: &[String]) -> Result<Vec<Ticket>> {
        let query = build_ticket_query(project_keys).ok_or_else(|| {
            ApiError::NotConfigured("no projects selected".to_string())
        })?;
        let limit = self.config.issue_limit;

        debug!(projects = project_keys.len(), limit, "fetching tickets");
        let issues: Vec<Value> = self
            .get_json(
                "issues",
                &[
                    ("query", query),
                    ("fields", ISSUE_FIELDS.to_string()),
                    ("$top", limit.to_string()),
                ],
            )
            .await?;

        let received = issues.len();
        if received >= limit as usize {
            warn!(
                received,
                limit, "issue fetch hit the configured limit; older issues may be missing"
            );
        }

        let tickets = parse_tickets(issues, &self.base_url);
        if tickets.len() < received {
            warn!(
                skipped = received - tickets.len(),
                "skipped issues without a readable id"
            );
        }
        debug!(count = tickets.len(), "tickets normalized");
        Ok(tickets)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url_for(path);
        debug!(%url, "GET");
        let response = self.http.get(&url).query(query).send().await?;
        Self::parse_json(response, &url).await
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response, url).await);
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }

    async fn error_from_response(response: Response, url: &str) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, url, &body);
        debug!(error = %err, "request failed");
        err
    }
}

/// Checks the base URL before a request is attempted and returns it normalized.
pub fn validate_base_url(base_url: &str) -> Result<String> {
    let normalized = normalize_base_url(base_url);
    if normalized.is_empty() {
        return Err(ApiError::MalformedUrl("base url is empty".to_string()));
    }
    let parsed =
        Url::parse(&normalized).map_err(|err| ApiError::MalformedUrl(format!("{normalized}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::MalformedUrl(format!(
            "{normalized}: expected an http(s) url with a host"
        )));
    }
    Ok(normalized)
}

/// Builds the disjunctive project filter, e.g. `project: AGV or project: DEV`.
/// Returns `None` when no non-blank key remains.
pub fn build_ticket_query(project_keys: &[String]) -> Option<String> {
    let terms: Vec<String> = project_keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(|key| format!("project: {}", quote_project_key(key)))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" or "))
    }
}

/// Keys with characters outside `[A-Za-z0-9_-]` are wrapped in braces, the
/// query-language form for values containing spaces.
fn quote_project_key(key: &str) -> String {
    let plain = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        key.to_string()
    } else {
        format!("{{{key}}}")
    }
}

/// Normalizes a decoded `/api/issues` array. Elements that are not objects or
/// lack a readable id are dropped; everything else yields a ticket.
pub fn parse_tickets(issues: Vec<Value>, base_url: &str) -> Vec<Ticket> {
    issues
        .into_iter()
        .filter_map(RawIssue::from_value)
        .filter_map(|raw| Ticket::from_raw(&raw, base_url))
        .collect()
}

fn build_http_client(config: &ApiConfig) -> Result<HttpClient> {
    let token = config.token.trim();
    if token.is_empty() {
        return Err(ApiError::NotConfigured("token is empty".to_string()));
    }

    let mut headers = HeaderMap::new();
    let mut auth_value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ApiError::NotConfigured("token contains characters not allowed in a header".to_string())
    })?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(crate::config::DEFAULT_USER_AGENT)),
    );

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| ApiError::Network(err.to_string()))
}

/// One-shot helpers for callers holding a candidate URL and token.
pub async fn validate_connection(base_url: &str, token: &str) -> Result<()> {
    YouTrackClient::new(ApiConfig::new(base_url, token))?
        .validate_connection()
        .await
}

pub async fn fetch_current_user(base_url: &str, token: &str) -> Result<UserProfile> {
    YouTrackClient::new(ApiConfig::new(base_url, token))?
        .fetch_current_user()
        .await
}

pub async fn fetch_projects(base_url: &str, token: &str) -> Result<Vec<Project>> {
    YouTrackClient::new(ApiConfig::new(base_url, token))?
        .fetch_projects()
        .await
}

pub async fn fetch_tickets(
    base_url: &str,
    token: &str,
    project_keys: &[String],
) -> Result<Vec<Ticket>> {
    if build_ticket_query(project_keys).is_none() {
        return Err(ApiError::NotConfigured("no projects selected".to_string()));
    }
    YouTrackClient::new(ApiConfig::new(base_url, token))?
        .fetch_tickets(project_keys)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn builds_disjunctive_query() {
        assert_eq!(
            build_ticket_query(&keys(&["AGV", " DEV ", ""])).as_deref(),
            Some("project: AGV or project: DEV")
        );
        assert_eq!(
            build_ticket_query(&keys(&["My Project"])).as_deref(),
            Some("project: {My Project}")
        );
        assert!(build_ticket_query(&keys(&["", "  "])).is_none());
        assert!(build_ticket_query(&[]).is_none());
    }

    #[test]
    fn rejects_malformed_base_urls() {
        for url in ["", "   ", "not a url", "ftp://host", "https://"] {
            assert!(
                matches!(validate_base_url(url), Err(ApiError::MalformedUrl(_))),
                "{url:?} should be rejected"
            );
        }
        assert_eq!(validate_base_url(" https://h/ ").unwrap(), "https://h");
    }

    #[tokio::test]
    async fn empty_project_keys_fail_without_network() {
        // Unroutable on purpose: any request attempt would surface as Network.
        let err = fetch_tickets("http://127.0.0.1:1", "token", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));

        let client = YouTrackClient::new(ApiConfig::new("http://127.0.0.1:1", "token")).unwrap();
        let err = client.fetch_tickets(&keys(&[" "])).await.unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn fetch_tickets_sends_filter_and_normalizes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/issues")
            .match_header("authorization", "Bearer perm-token")
            .match_header("accept", "application/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "project: AGV or project: DEV".into()),
                Matcher::UrlEncoded("fields".into(), ISSUE_FIELDS.into()),
                Matcher::UrlEncoded("$top".into(), "5000".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "idReadable": "AGV-1",
                        "summary": "x",
                        "url": "https://ignored/issue/AGV-1",
                        "customFields": [
                            {"name": "Priority", "value": {"name": "Critical"}},
                            {"name": "Sprints", "value": [{"name": "S1"}, {"name": "S2"}]}
                        ]
                    },
                    {"summary": "no id"},
                    {
                        "idReadable": "DEV-2",
                        "summary": "y",
                        "customFields": [{"name": "Type", "value": {"name": "Bug"}}]
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let base = format!("{}/ ", server.url());
        let tickets = fetch_tickets(&base, "perm-token", &keys(&["AGV", "DEV"]))
            .await
            .expect("fetch succeeds");
        mock.assert_async().await;

        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].id, "AGV-1");
        assert_eq!(tickets[0].priority, "Critical");
        assert_eq!(tickets[0].sprints, vec!["S1", "S2"]);
        assert_eq!(tickets[0].url, format!("{}/issues/AGV-1", server.url()));
        assert_eq!(tickets[1].issue_type, "Bug");
        assert!(tickets[1].sprints.is_empty());
    }

    #[tokio::test]
    async fn full_page_at_issue_limit_keeps_every_issue() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/issues")
            .match_query(Matcher::UrlEncoded("$top".into(), "2".into()))
            .with_status(200)
            .with_body(
                json!([
                    {"idReadable": "AGV-1", "summary": "a", "customFields": []},
                    {"idReadable": "AGV-2", "summary": "b", "customFields": []}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = YouTrackClient::new(ApiConfig::new(server.url(), "t").with_issue_limit(2))
            .expect("client");
        let tickets = client
            .fetch_tickets(&keys(&["AGV"]))
            .await
            .expect("capped fetch still succeeds");
        mock.assert_async().await;

        let ids: Vec<&str> = tickets.iter().map(|ticket| ticket.id.as_str()).collect();
        assert_eq!(ids, ["AGV-1", "AGV-2"]);
    }

    #[tokio::test]
    async fn non_array_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"issues": []}"#)
            .create_async()
            .await;

        let err = fetch_tickets(&server.url(), "t", &keys(&["AGV"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn validate_connection_classifies_statuses() {
        let mut server = Server::new_async().await;
        let cases = [
            (200, None),
            (401, Some("Invalid token. Check your YouTrack permanent token.")),
            (404, Some("YouTrack URL or API path may be wrong. Check the base URL.")),
            (503, Some("YouTrack server error. Try again later.")),
        ];

        for (status, expected) in cases {
            let mock = server
                .mock("GET", "/api/users/me")
                .match_query(Matcher::Any)
                .with_status(status)
                .with_body("{}")
                .expect(1)
                .create_async()
                .await;

            let result = validate_connection(&server.url(), "t").await;
            match expected {
                None => assert!(result.is_ok(), "status {status} should validate"),
                Some(message) => {
                    let err = result.unwrap_err();
                    assert_eq!(err.user_message(), message);
                    assert_eq!(err.status().map(|s| s.as_u16()), Some(status as u16));
                }
            }
            mock.assert_async().await;
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let err = validate_connection("http://127.0.0.1:1", "t").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_url_fails_before_request() {
        let err = validate_connection("youtrack.example.com", "t").await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedUrl(_)));
        assert_eq!(err.user_message(), "Invalid YouTrack URL.");
    }

    #[tokio::test]
    async fn fetch_current_user_decodes_identity() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/users/me")
            .match_query(Matcher::UrlEncoded("fields".into(), USER_FIELDS.into()))
            .with_status(200)
            .with_body(r#"{"id":"1-5","name":"Jane","email":"jane@example.com","$type":"Me"}"#)
            .create_async()
            .await;

        let user = fetch_current_user(&server.url(), "t").await.expect("user");
        assert_eq!(user.id, "1-5");
        assert_eq!(user.name.as_deref(), Some("Jane"));
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn fetch_projects_follows_pages() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/api/admin/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("$skip".into(), "0".into()),
                Matcher::UrlEncoded("$top".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([
                    {"id": "0-1", "name": "Agv", "shortName": "AGV", "archived": false},
                    {"id": "0-2", "name": "Dev", "shortName": "DEV", "archived": true}
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/admin/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("$skip".into(), "2".into()),
                Matcher::UrlEncoded("$top".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(json!([{"id": "0-3", "name": "Ops", "shortName": "OPS"}]).to_string())
            .create_async()
            .await;

        let client = YouTrackClient::new(
            ApiConfig::new(server.url(), "t").with_project_page_size(2),
        )
        .unwrap();
        let projects = client.fetch_projects().await.expect("projects");
        first.assert_async().await;
        second.assert_async().await;

        let codes: Vec<_> = projects.iter().map(|p| p.short_name.as_str()).collect();
        assert_eq!(codes, vec!["AGV", "DEV", "OPS"]);
        assert!(projects[1].archived);
        assert!(!projects[2].archived);
    }
}
