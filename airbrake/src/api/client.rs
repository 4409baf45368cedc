use reqwest::Response;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::ApiError;

/// Query parameter carrying the credential on every authenticated call
pub const API_KEY_PARAM: &str = "key";

const SESSIONS_PATH: &str = "sessions";
const CURRENT_USER_PATH: &str = "users/current";

/// Credential attached to a session
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static key from the Airbrake profile page
    ApiKey(String),
    /// Token obtained from an email/password login
    SessionToken(String),
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::ApiKey(key) => key,
            Credential::SessionToken(token) => token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credential::SessionToken(_) => f.write_str("SessionToken(<redacted>)"),
        }
    }
}

/// Base URL plus the credential used for every request.
///
/// The base URL always ends with `/` so resource paths join beneath it.
/// A session without credential sends unauthenticated requests, which only
/// the login exchange does.
#[derive(Clone, Debug)]
pub struct Session {
    base_url: Url,
    credential: Option<Credential>,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            base_url,
            credential: None,
        })
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }
}

/// Login material as supplied by configuration; empty strings mean unset
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("terraform-provider-airbrake/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Airbrake treats every status below 300 as success
pub fn is_success(status: u16) -> bool {
    status < 300
}

/// Airbrake API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    session: Session,
}

impl Client {
    /// Create a client for an already established session
    pub fn new(session: Session) -> Result<Self, ApiError> {
        Self::with_config(session, &ClientConfig::default())
    }

    pub fn with_config(session: Session, config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::from_parts(build_http(config)?, session))
    }

    fn from_parts(http: reqwest::Client, session: Session) -> Self {
        Self {
            inner: Arc::new(ClientInner { http, session }),
        }
    }

    /// Establish a session against `base_url`.
    ///
    /// A non-empty API key wins: it is validated by reading the current user.
    /// Otherwise email and password are exchanged for a session token.
    pub async fn authenticate(base_url: &str, credentials: &Credentials) -> Result<Self, ApiError> {
        Self::authenticate_with_config(base_url, credentials, &ClientConfig::default()).await
    }

    pub async fn authenticate_with_config(
        base_url: &str,
        credentials: &Credentials,
        config: &ClientConfig,
    ) -> Result<Self, ApiError> {
        let session = Session::new(base_url)?;
        let http = build_http(config)?;

        if !credentials.api_key.is_empty() {
            let client = Self::from_parts(
                http,
                session.with_credential(Credential::ApiKey(credentials.api_key.clone())),
            );
            let response = client.list(CURRENT_USER_PATH, &[]).await?;
            if !response.is_success() {
                return Err(ApiError::InvalidCredentials(format!(
                    "{} rejected the API key (HTTP {})",
                    CURRENT_USER_PATH, response.status
                )));
            }
            tracing::info!("Authenticated to Airbrake with API key");
            return Ok(client);
        }

        let anonymous = Self::from_parts(http.clone(), session.clone());
        let response = anonymous
            .list(
                SESSIONS_PATH,
                &[
                    ("email", credentials.email.as_str()),
                    ("password", credentials.password.as_str()),
                ],
            )
            .await?;
        if !response.is_success() {
            return Err(ApiError::InvalidCredentials(format!(
                "{}: wrong email or password (HTTP {})",
                SESSIONS_PATH, response.status
            )));
        }

        let token = extract_token(&response.body)?;
        tracing::info!(email = %credentials.email, "Authenticated to Airbrake with session token");
        Ok(Self::from_parts(
            http,
            session.with_credential(Credential::SessionToken(token)),
        ))
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// GET `path` with caller parameters plus the credential
    pub async fn list(&self, path: &str, params: &[(&str, &str)]) -> Result<RawResponse, ApiError> {
        let url = self.authorized_url(path, params)?;
        tracing::debug!(method = "GET", path, "Airbrake request");

        let response = self.inner.http.get(url).send().await?;
        read_response(response).await
    }

    /// POST `path` with form fields sent as query parameters, no body document
    pub async fn create(&self, path: &str, form: &[(&str, &str)]) -> Result<RawResponse, ApiError> {
        let url = self.authorized_url(path, form)?;
        tracing::debug!(method = "POST", path, "Airbrake request");

        let response = self.inner.http.post(url).send().await?;
        read_response(response).await
    }

    /// PUT `path/id` with `fields` as a JSON document; returns the status
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        path: &str,
        id: &str,
        fields: &B,
    ) -> Result<u16, ApiError> {
        let resource_path = format!("{}/{}", path, id);
        let url = self.authorized_url(&resource_path, &[])?;
        tracing::debug!(method = "PUT", path = %resource_path, "Airbrake request");

        // json() also declares Content-Type: application/json
        let response = self.inner.http.put(url).json(fields).send().await?;
        let status = response.status().as_u16();
        tracing::debug!(status, "Airbrake response");
        Ok(status)
    }

    /// DELETE `path/id`; returns the status
    pub async fn remove(&self, path: &str, id: &str) -> Result<u16, ApiError> {
        let resource_path = format!("{}/{}", path, id);
        let url = self.authorized_url(&resource_path, &[])?;
        tracing::debug!(method = "DELETE", path = %resource_path, "Airbrake request");

        let response = self.inner.http.delete(url).send().await?;
        let status = response.status().as_u16();
        tracing::debug!(status, "Airbrake response");
        Ok(status)
    }

    fn authorized_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.inner.session.endpoint(path)?;
        let credential = self.inner.session.credential();

        if !params.is_empty() || credential.is_some() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(credential) = credential {
                query.append_pair(API_KEY_PARAM, credential.secret());
            }
        }

        Ok(url)
    }
}

fn build_http(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .build()?)
}

async fn read_response(response: Response) -> Result<RawResponse, ApiError> {
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    tracing::debug!(status, bytes = body.len(), "Airbrake response");
    Ok(RawResponse { status, body })
}

fn extract_token(body: &[u8]) -> Result<String, ApiError> {
    let response: serde_json::Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| ApiError::malformed(SESSIONS_PATH, e))?;

    match response.get("token") {
        Some(Value::String(token)) => Ok(token.clone()),
        Some(_) => Err(ApiError::malformed(SESSIONS_PATH, "token is not a string")),
        None => Err(ApiError::malformed(SESSIONS_PATH, "token not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn credentials(email: &str, password: &str, api_key: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn session_appends_trailing_slash() {
        let session = Session::new("https://api.airbrake.io/api/v4").unwrap();
        assert_eq!(session.base_url().as_str(), "https://api.airbrake.io/api/v4/");

        let session = Session::new("https://api.airbrake.io/api/v4/").unwrap();
        assert_eq!(session.base_url().as_str(), "https://api.airbrake.io/api/v4/");
        assert!(session.credential().is_none());
    }

    #[test]
    fn session_rejects_empty_base_url() {
        let result = Session::new("");
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn credentials_never_show_in_debug_output() {
        let credential = Credential::SessionToken("s3cr3t".to_string());
        assert!(!format!("{:?}", credential).contains("s3cr3t"));

        let creds = credentials("dev@example.com", "hunter2", "abc123");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("dev@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("abc123"));
    }

    #[tokio::test]
    async fn authenticate_with_api_key_validates_current_user() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/users/current")
            .match_query(Matcher::UrlEncoded("key".into(), "abc123".into()))
            .with_status(200)
            .with_body(r#"{"id":1,"email":"dev@example.com"}"#)
            .create_async()
            .await;

        let client = Client::authenticate(&server.url(), &credentials("", "", "abc123"))
            .await
            .unwrap();

        assert_eq!(
            client.session().credential(),
            Some(&Credential::ApiKey("abc123".to_string()))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn authenticate_rejects_invalid_api_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/current")
            .match_query(Matcher::UrlEncoded("key".into(), "bad-key".into()))
            .with_status(401)
            .with_body(r#"{"message":"unauthorized"}"#)
            .create_async()
            .await;

        let result = Client::authenticate(&server.url(), &credentials("", "", "bad-key")).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn api_key_takes_precedence_over_password_login() {
        let mut server = Server::new_async().await;
        let current = server
            .mock("GET", "/users/current")
            .match_query(Matcher::UrlEncoded("key".into(), "abc123".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let sessions = server
            .mock("GET", "/sessions")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "hunter2", "abc123"),
        )
        .await
        .unwrap();

        assert!(matches!(
            client.session().credential(),
            Some(Credential::ApiKey(_))
        ));
        current.assert_async().await;
        sessions.assert_async().await;
    }

    #[tokio::test]
    async fn authenticate_exchanges_email_and_password_for_token() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("GET", "/sessions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("email".into(), "dev@example.com".into()),
                Matcher::UrlEncoded("password".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"token":"session-token","user_id":7}"#)
            .create_async()
            .await;
        let projects = server
            .mock("GET", "/projects")
            .match_query(Matcher::UrlEncoded("key".into(), "session-token".into()))
            .with_status(200)
            .with_body(r#"{"projects":[]}"#)
            .create_async()
            .await;

        let client = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "hunter2", ""),
        )
        .await
        .unwrap();

        assert_eq!(
            client.session().credential(),
            Some(&Credential::SessionToken("session-token".to_string()))
        );

        let response = client.list("projects", &[]).await.unwrap();
        assert!(response.is_success());

        login.assert_async().await;
        projects.assert_async().await;
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sessions")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let result = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "wrong", ""),
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn login_without_token_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sessions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"user_id":7}"#)
            .create_async()
            .await;

        let result = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "hunter2", ""),
        )
        .await;
        match result {
            Err(ApiError::MalformedResponse { context, detail }) => {
                assert_eq!(context, "sessions");
                assert!(detail.contains("token not found"));
            }
            other => panic!("Expected MalformedResponse, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn login_with_non_string_token_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sessions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"token":12345}"#)
            .create_async()
            .await;

        let result = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "hunter2", ""),
        )
        .await;
        assert!(matches!(result, Err(ApiError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn login_with_non_json_body_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/sessions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let result = Client::authenticate(
            &server.url(),
            &credentials("dev@example.com", "hunter2", ""),
        )
        .await;
        assert!(matches!(result, Err(ApiError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn transport_failures_keep_credentials_out_of_errors() {
        let attempts = [
            credentials("", "", "SUPERSECRETKEY"),
            credentials("dev@example.com", "HUNTER2PW", ""),
        ];

        for creds in &attempts {
            let err = Client::authenticate("http://127.0.0.1:1", creds)
                .await
                .err()
                .unwrap();
            assert!(err.is_transport(), "unexpected error: {}", err);

            let rendered = format!("{} {:?}", err, err);
            assert!(!rendered.contains("SUPERSECRETKEY"), "api key leaked: {}", rendered);
            assert!(!rendered.contains("HUNTER2PW"), "password leaked: {}", rendered);
        }
    }

    #[tokio::test]
    async fn list_sends_params_and_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"projects":[]}"#)
            .create_async()
            .await;

        let client = crate::api::test_helpers::create_test_client(&server.url());
        let response = client.list("projects", &[("page", "2")]).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), r#"{"projects":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_returns_error_statuses_without_failing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/projects")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = crate::api::test_helpers::create_test_client(&server.url());
        let response = client.list("projects", &[]).await.unwrap();

        assert_eq!(response.status, 503);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn create_sends_form_fields_as_query_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "my app".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(201)
            .with_body(r#"{"id":42,"name":"my app"}"#)
            .create_async()
            .await;

        let client = crate::api::test_helpers::create_test_client(&server.url());
        let response = client.create("projects", &[("name", "my app")]).await.unwrap();

        assert_eq!(response.status, 201);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_sends_json_body_to_resource_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/projects/42")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"language": "go"})))
            .with_status(200)
            .create_async()
            .await;

        let client = crate::api::test_helpers::create_test_client(&server.url());
        let status = client
            .update("projects", "42", &json!({"language": "go"}))
            .await
            .unwrap();

        assert_eq!(status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_issues_delete_to_resource_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/projects/42")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(204)
            .create_async()
            .await;

        let client = crate::api::test_helpers::create_test_client(&server.url());
        let status = client.remove("projects", "42").await.unwrap();

        assert_eq!(status, 204);
        assert!(is_success(status));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn requests_resolve_under_base_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects")
            .match_query(Matcher::UrlEncoded("key".into(), "k".into()))
            .with_status(200)
            .with_body(r#"{"projects":[]}"#)
            .create_async()
            .await;

        let session = Session::new(&format!("{}/api/v4", server.url()))
            .unwrap()
            .with_credential(Credential::ApiKey("k".to_string()));
        let client = Client::new(session).unwrap();
        client.list("projects", &[]).await.unwrap();

        mock.assert_async().await;
    }
}
