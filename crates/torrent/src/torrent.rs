use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TorrentError};
use crate::preferences::Preferences;

const LOGIN_PATH: &str = "/api/v2/auth/login";
const PREFERENCES_PATH: &str = "/api/v2/app/preferences";
const SET_PREFERENCES_PATH: &str = "/api/v2/app/setPreferences";

/// Timeout applied to every request sent to qBittorrent
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Literal body qBittorrent answers a successful login with
const LOGIN_OK: &str = "Ok.";

/// qBittorrent Web UI credentials
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Outcome of a listening port update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortUpdate {
    /// The preferences already carried the port, nothing was sent
    Unchanged,
    /// `setPreferences` accepted the new port
    Updated,
}

/// Wrapper around a cookie-bearing qBittorrent Web API session
#[derive(Clone)]
pub struct TorrentApi {
    client: Client,
    endpoint: String,
    credential: Credential,
    logged_in: Arc<AtomicBool>,
}

impl TorrentApi {
    /// Create a new client for the Web UI at `endpoint`, e.g. `http://localhost:8080`
    ///
    /// No request is made until [`TorrentApi::login`] or
    /// [`TorrentApi::preferences`] is called.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(endpoint: &str, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(TorrentApi {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
            logged_in: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the last login attempt succeeded
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Authenticate with the qBittorrent server
    ///
    /// The session cookie handed out on success is kept in the client's
    /// cookie store and sent with every later call.
    ///
    /// # Errors
    /// Returns an error if the request fails or the server does not answer `Ok.`
    pub async fn login(&self) -> Result<()> {
        let result = self.try_login().await;
        self.logged_in.store(result.is_ok(), Ordering::SeqCst);

        match &result {
            Ok(()) => tracing::info!("Logged into qBittorrent successfully"),
            Err(e) => tracing::error!("qBittorrent login failed: {}", e),
        }
        result
    }

    async fn try_login(&self) -> Result<()> {
        let body = self
            .client
            .post(self.url(LOGIN_PATH))
            .form(&[
                ("username", self.credential.username.as_str()),
                ("password", self.credential.password.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;

        let body = body.trim();
        if body == LOGIN_OK {
            Ok(())
        } else {
            Err(TorrentError::LoginRejected(body.to_string()))
        }
    }

    /// Fetch the application preferences
    ///
    /// A `403` means the session expired: one re-login is attempted followed
    /// by exactly one retry of the request. Any failure after that is
    /// returned as is.
    pub async fn preferences(&self) -> Result<Preferences> {
        let response = self.client.get(self.url(PREFERENCES_PATH)).send().await?;

        let response = if response.status() == StatusCode::FORBIDDEN {
            tracing::info!("qBittorrent session expired, attempting to re-login...");
            self.login()
                .await
                .map_err(|_| TorrentError::ReauthFailed)?;

            let retry = self.client.get(self.url(PREFERENCES_PATH)).send().await?;
            if !retry.status().is_success() {
                return Err(TorrentError::Status {
                    context: "failed to get preferences after login",
                    status: retry.status(),
                });
            }
            retry
        } else if !response.status().is_success() {
            return Err(TorrentError::Status {
                context: "failed to get preferences",
                status: response.status(),
            });
        } else {
            response
        };

        let body = response.text().await?;
        Preferences::from_body(&body)
    }

    /// Make qBittorrent listen on `port`
    ///
    /// # Arguments
    /// * `prefs` - Preferences fetched earlier in the same cycle
    /// * `port` - Port to listen on
    ///
    /// # Returns
    /// * `PortUpdate::Unchanged` when `prefs` already has the port, without any request
    /// * `PortUpdate::Updated` once the full document has been accepted
    pub async fn set_listen_port(&self, prefs: &mut Preferences, port: u16) -> Result<PortUpdate> {
        if prefs.listen_port() == Some(port) {
            tracing::info!("Port already set to {}, no update needed", port);
            return Ok(PortUpdate::Unchanged);
        }

        prefs.set_listen_port(port);
        let response = self
            .client
            .post(self.url(SET_PREFERENCES_PATH))
            .form(&[("json", prefs.to_json())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TorrentError::Status {
                context: "failed to update port",
                status: response.status(),
            });
        }

        tracing::info!("Updated qBittorrent to use port {}", port);
        Ok(PortUpdate::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn api_for(server: &MockServer) -> TorrentApi {
        TorrentApi::new(&server.base_url(), Credential::new("admin", "adminadmin")).unwrap()
    }

    #[tokio::test]
    async fn test_login_ok() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .body_includes("username=admin")
                .body_includes("password=adminadmin");
            then.status(200).body("Ok.");
        });

        let api = api_for(&server);
        assert!(!api.is_logged_in());
        api.login().await.unwrap();
        assert!(api.is_logged_in());
        mock.assert();
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).body("Fails.");
        });

        let api = api_for(&server);
        let err = api.login().await.unwrap_err();
        assert!(matches!(err, TorrentError::LoginRejected(body) if body == "Fails."));
        assert!(!api.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_unreachable() {
        let api = TorrentApi::new("http://127.0.0.1:1", Credential::default()).unwrap();
        let err = api.login().await.unwrap_err();
        assert!(matches!(err, TorrentError::Transport(_)));
        assert!(!api.is_logged_in());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let api = TorrentApi::new("http://localhost:8080/", Credential::default()).unwrap();
        assert_eq!(api.endpoint(), "http://localhost:8080");
        assert_eq!(api.url(LOGIN_PATH), "http://localhost:8080/api/v2/auth/login");
    }

    #[tokio::test]
    async fn test_preferences_ok() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path(PREFERENCES_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"listen_port":51413}"#);
        });

        let prefs = api_for(&server).preferences().await.unwrap();
        assert_eq!(prefs.listen_port(), Some(51413));
        mock.assert();
    }

    #[tokio::test]
    async fn test_preferences_relogin_after_expired_session() {
        let server = MockServer::start_async().await;
        let expired = server.mock(|when, then| {
            when.method(GET).path(PREFERENCES_PATH).header_missing("cookie");
            then.status(403).body("Forbidden");
        });
        let login = server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200)
                .header("set-cookie", "SID=fresh; HttpOnly; path=/")
                .body("Ok.");
        });
        let fresh = server.mock(|when, then| {
            when.method(GET)
                .path(PREFERENCES_PATH)
                .header("cookie", "SID=fresh");
            then.status(200).body(r#"{"listen_port":6881}"#);
        });

        let api = api_for(&server);
        let prefs = api.preferences().await.unwrap();
        assert_eq!(prefs.listen_port(), Some(6881));
        assert!(api.is_logged_in());
        expired.assert_hits(1);
        login.assert_hits(1);
        fresh.assert_hits(1);
    }

    #[tokio::test]
    async fn test_preferences_second_forbidden_aborts() {
        let server = MockServer::start_async().await;
        let prefs = server.mock(|when, then| {
            when.method(GET).path(PREFERENCES_PATH);
            then.status(403).body("Forbidden");
        });
        let login = server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).body("Ok.");
        });

        let err = api_for(&server).preferences().await.unwrap_err();
        assert!(matches!(
            err,
            TorrentError::Status { status, .. } if status == StatusCode::FORBIDDEN
        ));
        login.assert_hits(1);
        prefs.assert_hits(2);
    }

    #[tokio::test]
    async fn test_preferences_reauth_rejected() {
        let server = MockServer::start_async().await;
        let prefs = server.mock(|when, then| {
            when.method(GET).path(PREFERENCES_PATH);
            then.status(403);
        });
        let login = server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).body("Fails.");
        });

        let err = api_for(&server).preferences().await.unwrap_err();
        assert!(matches!(err, TorrentError::ReauthFailed));
        login.assert_hits(1);
        prefs.assert_hits(1);
    }

    #[tokio::test]
    async fn test_preferences_server_error_no_relogin() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(PREFERENCES_PATH);
            then.status(500);
        });
        let login = server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).body("Ok.");
        });

        let err = api_for(&server).preferences().await.unwrap_err();
        assert!(matches!(err, TorrentError::Status { .. }));
        login.assert_hits(0);
    }

    #[tokio::test]
    async fn test_set_listen_port_posts_whole_document() {
        let server = MockServer::start_async().await;
        let set = server.mock(|when, then| {
            when.method(POST)
                .path(SET_PREFERENCES_PATH)
                .header("content-type", "application/x-www-form-urlencoded")
                .body_includes("json=")
                .body_includes("%22listen_port%22%3A55000")
                .body_includes("%22save_path%22");
            then.status(200);
        });

        let api = api_for(&server);
        let mut prefs =
            Preferences::from_body(r#"{"listen_port":51413,"save_path":"/downloads"}"#).unwrap();
        let update = api.set_listen_port(&mut prefs, 55000).await.unwrap();
        assert_eq!(update, PortUpdate::Updated);
        assert_eq!(prefs.listen_port(), Some(55000));
        set.assert_hits(1);
    }

    #[tokio::test]
    async fn test_set_listen_port_same_port_sends_nothing() {
        let server = MockServer::start_async().await;
        let set = server.mock(|when, then| {
            when.method(POST).path(SET_PREFERENCES_PATH);
            then.status(200);
        });

        let api = api_for(&server);
        let mut prefs = Preferences::from_body(r#"{"listen_port":55000}"#).unwrap();
        let update = api.set_listen_port(&mut prefs, 55000).await.unwrap();
        assert_eq!(update, PortUpdate::Unchanged);
        set.assert_hits(0);
    }

    #[tokio::test]
    async fn test_set_listen_port_rejected() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(SET_PREFERENCES_PATH);
            then.status(400).body("Bad Request");
        });

        let api = api_for(&server);
        let mut prefs = Preferences::from_body(r#"{"listen_port":51413}"#).unwrap();
        let err = api.set_listen_port(&mut prefs, 55000).await.unwrap_err();
        assert!(matches!(
            err,
            TorrentError::Status { status, .. } if status == StatusCode::BAD_REQUEST
        ));
    }
}
