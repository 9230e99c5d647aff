use std::time::Duration;

use reqwest::{header::HeaderMap, Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::{RateLimit, UserProfile, WatcherPage, WatcherSummary};

pub const GITHUB_API_URL: &str = "https://api.github.com";

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "rust-client";
const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Response headers copied into a profile's meta field.
const META_HEADERS: [&str; 7] = [
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
    "x-oauth-scopes",
    "link",
    "last-modified",
    "etag",
];

#[derive(Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthenticateError {
    #[error("EmptyCredentials: {field} is empty")]
    EmptyCredentials { field: &'static str },

    #[error("BuildClient: {source}")]
    BuildClient { source: reqwest::Error },
}

/// Session against the GitHub API. Only obtainable through `authenticate`,
/// so every request carries credentials.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl GitHubClient {
    pub fn authenticate(credentials: Credentials) -> Result<Self, AuthenticateError> {
        Self::authenticate_at(GITHUB_API_URL, credentials)
    }

    /// Same as `authenticate`, against another API root (GitHub Enterprise).
    pub fn authenticate_at(
        base_url: &str,
        credentials: Credentials,
    ) -> Result<Self, AuthenticateError> {
        match &credentials {
            Credentials::Basic { username, .. } if username.is_empty() => {
                return Err(AuthenticateError::EmptyCredentials { field: "username" })
            }
            Credentials::Basic { password, .. } if password.is_empty() => {
                return Err(AuthenticateError::EmptyCredentials { field: "password" })
            }
            Credentials::Token(token) if token.is_empty() => {
                return Err(AuthenticateError::EmptyCredentials { field: "token" })
            }
            _ => {}
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| AuthenticateError::BuildClient { source })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Accept", ACCEPT_V3);

        match &self.credentials {
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Token(token) => {
                request.header("Authorization", format!("Bearer {token}"))
            }
        }
    }

    pub async fn fetch_repo_watchers(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<WatcherPage, FetchRepoWatchersError> {
        debug!(owner, repo, page, "GET watchers");

        let response = self
            .get(&format!("/repos/{owner}/{repo}/subscribers"))
            .query(&[("page", api_page(page))])
            .send()
            .await
            .map_err(|source| FetchRepoWatchersError::RequestSend { source })?;

        let status = response.status();
        let rate_limit = RateLimit::from_headers(response.headers());

        let body = response
            .text()
            .await
            .map_err(|source| FetchRepoWatchersError::ResponseRead { source })?;

        if !status.is_success() {
            return Err(FetchRepoWatchersError::UnexpectedStatus { status, body });
        }

        let watchers: Vec<WatcherSummary> = serde_json::from_str(&body)
            .map_err(|source| FetchRepoWatchersError::DeserializeResponseBody { source })?;

        Ok(WatcherPage {
            owner: owner.to_string(),
            repo: repo.to_string(),
            page,
            watchers,
            rate_limit,
        })
    }

    pub async fn fetch_user_profile(
        &self,
        login: &str,
    ) -> Result<UserProfile, FetchUserProfileError> {
        debug!(login, "GET user profile");

        let response = self
            .get(&format!("/users/{login}"))
            .send()
            .await
            .map_err(|source| FetchUserProfileError::RequestSend { source })?;

        let status = response.status();
        let meta = response_meta(status, response.headers());

        let body = response
            .text()
            .await
            .map_err(|source| FetchUserProfileError::ResponseRead { source })?;

        if !status.is_success() {
            return Err(FetchUserProfileError::UnexpectedStatus { status, body });
        }

        let fields: Map<String, Value> = serde_json::from_str(&body)
            .map_err(|source| FetchUserProfileError::DeserializeResponseBody { source })?;

        Ok(UserProfile::new(fields, meta))
    }
}

/// The API numbers pages from 1.
fn api_page(page: u32) -> u32 {
    page.saturating_add(1)
}

fn response_meta(status: StatusCode, headers: &HeaderMap) -> Map<String, Value> {
    let mut meta: Map<String, Value> = META_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            Some((name.to_string(), Value::String(value.to_string())))
        })
        .collect();

    meta.insert("status".to_string(), Value::String(status.to_string()));
    meta
}

#[derive(Debug, Error)]
pub enum FetchRepoWatchersError {
    #[error("RequestSend: {source}")]
    RequestSend { source: reqwest::Error },

    #[error("ResponseRead: {source}")]
    ResponseRead { source: reqwest::Error },

    #[error("UnexpectedStatus: {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("DeserializeResponseBody: {source}")]
    DeserializeResponseBody { source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum FetchUserProfileError {
    #[error("RequestSend: {source}")]
    RequestSend { source: reqwest::Error },

    #[error("ResponseRead: {source}")]
    ResponseRead { source: reqwest::Error },

    #[error("UnexpectedStatus: {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("DeserializeResponseBody: {source}")]
    DeserializeResponseBody { source: serde_json::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn basic(username: &str, password: &str) -> Credentials {
        Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn page_index_maps_to_one_based_api_page() {
        assert_eq!(api_page(0), 1);
        assert_eq!(api_page(1), 2);
        assert_eq!(api_page(u32::MAX), u32::MAX);
    }

    #[test]
    fn response_meta_collects_known_headers_and_status() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("42"));
        headers.insert("etag", HeaderValue::from_static("\"abc\""));
        headers.insert("x-unrelated", HeaderValue::from_static("ignored"));

        let meta = response_meta(StatusCode::OK, &headers);

        assert_eq!(meta.len(), 3);
        assert_eq!(meta["x-ratelimit-remaining"], "42");
        assert_eq!(meta["etag"], "\"abc\"");
        assert_eq!(meta["status"], "200 OK");
    }

    #[test]
    fn authenticate_rejects_empty_credentials() {
        let err = GitHubClient::authenticate(basic("", "secret")).unwrap_err();
        assert!(matches!(err, AuthenticateError::EmptyCredentials { field: "username" }));

        let err = GitHubClient::authenticate(basic("octocat", "")).unwrap_err();
        assert!(matches!(err, AuthenticateError::EmptyCredentials { field: "password" }));

        let err = GitHubClient::authenticate(Credentials::Token(String::new())).unwrap_err();
        assert!(matches!(err, AuthenticateError::EmptyCredentials { field: "token" }));
    }

    #[test]
    fn authenticate_trims_trailing_slash_from_base_url() {
        let client =
            GitHubClient::authenticate_at("https://ghe.example.com/api/v3/", basic("octocat", "pw"))
                .unwrap();
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let rendered = format!("{:?}", basic("octocat", "hunter2"));
        assert!(rendered.contains("octocat"));
        assert!(!rendered.contains("hunter2"));

        let rendered = format!("{:?}", Credentials::Token("ghp_secret".into()));
        assert!(!rendered.contains("ghp_secret"));
    }

    fn canned_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect();
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n{headers}\r\n{body}",
            body.len()
        )
    }

    /// Answers one connection per canned response and hands back the raw
    /// request heads it received.
    async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head: Vec<u8> = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = socket.read(&mut chunk).await.unwrap();
                    if read == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..read]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            requests
        });

        (base_url, handle)
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[tokio::test]
    async fn watchers_request_uses_subscribers_path_and_one_based_page() {
        let (base_url, server) = serve(vec![canned_response(
            "200 OK",
            &[("x-ratelimit-remaining", "41")],
            r#"[{"login":"alice","id":1},{"login":"bob","id":2}]"#,
        )])
        .await;
        let client = GitHubClient::authenticate_at(&base_url, basic("octocat", "pw")).unwrap();

        let page = client.fetch_repo_watchers("symfony", "symfony", 1).await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(
            request_line(&requests[0]),
            "GET /repos/symfony/symfony/subscribers?page=2 HTTP/1.1"
        );
        let head = requests[0].to_ascii_lowercase();
        assert!(head.contains("authorization: basic "));
        assert!(head.contains("accept: application/vnd.github.v3+json"));
        assert!(head.contains("user-agent: rust-client"));

        assert_eq!(page.page, 1);
        assert_eq!(page.owner, "symfony");
        let logins: Vec<&str> = page.watchers.iter().map(|w| w.login.as_str()).collect();
        assert_eq!(logins, ["alice", "bob"]);
        assert_eq!(page.rate_limit.remaining, Some(41));
    }

    #[tokio::test]
    async fn profile_carries_meta_from_the_response() {
        let (base_url, server) = serve(vec![canned_response(
            "200 OK",
            &[("x-ratelimit-remaining", "7")],
            r#"{"login":"alice","id":1,"company":null}"#,
        )])
        .await;
        let client =
            GitHubClient::authenticate_at(&base_url, Credentials::Token("ghp_x".into())).unwrap();

        let mut profile = client.fetch_user_profile("alice").await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(request_line(&requests[0]), "GET /users/alice HTTP/1.1");
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer ghp_x"));

        let meta = profile.strip_meta().unwrap();
        assert_eq!(meta["status"], "200 OK");
        assert_eq!(meta["x-ratelimit-remaining"], "7");
        assert_eq!(
            Value::Object(profile.into_fields()),
            serde_json::json!({ "login": "alice", "id": 1, "company": null })
        );
    }

    #[tokio::test]
    async fn non_object_profile_body_fails_to_deserialize() {
        let (base_url, server) = serve(vec![canned_response("200 OK", &[], "[1,2]")]).await;
        let client = GitHubClient::authenticate_at(&base_url, basic("octocat", "pw")).unwrap();

        let err = client.fetch_user_profile("alice").await.unwrap_err();

        server.await.unwrap();
        assert!(matches!(err, FetchUserProfileError::DeserializeResponseBody { .. }));
    }

    #[tokio::test]
    async fn error_status_keeps_status_and_body() {
        let body = r#"{"message":"Not Found"}"#;
        let (base_url, server) = serve(vec![
            canned_response("404 Not Found", &[], body),
            canned_response("404 Not Found", &[], body),
        ])
        .await;
        let client = GitHubClient::authenticate_at(&base_url, basic("octocat", "pw")).unwrap();

        let err = client.fetch_repo_watchers("symfony", "gone", 0).await.unwrap_err();
        match err {
            FetchRepoWatchersError::UnexpectedStatus { status, body: received } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(received, body);
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }

        let err = client.fetch_user_profile("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            FetchUserProfileError::UnexpectedStatus { status, .. } if status == StatusCode::NOT_FOUND
        ));

        let requests = server.await.unwrap();
        assert_eq!(
            request_line(&requests[0]),
            "GET /repos/symfony/gone/subscribers?page=1 HTTP/1.1"
        );
        assert_eq!(request_line(&requests[1]), "GET /users/ghost HTTP/1.1");
    }
}
