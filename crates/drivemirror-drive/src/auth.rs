//! OAuth2 installed-application flow and credential lifecycle for Google Drive
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) against
//! Google's OAuth endpoints, persists tokens to a JSON file, and keeps the
//! shared transport supplied with a valid access token.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client credentials, endpoints and scopes
//! - [`Tokens`] / [`TokenFile`] - Token set and its on-disk JSON form
//! - [`InstalledAppFlow`] - PKCE challenge, code exchange and refresh
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`CredentialManager`] - Startup login and the periodic renewal loop

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use drivemirror_core::config::Config;
use drivemirror_core::ports::{SharedStore, TransportSwap};

use crate::client::DriveClient;
use crate::provider::DriveRemoteStore;

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default redirect URI for the local callback server
const REDIRECT_URI: &str = "http://127.0.0.1:8400/callback";

/// Full read/write access to the user's Drive
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens closer than this to expiry are refreshed at startup
const STARTUP_REFRESH_MARGIN_SECS: i64 = 300;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 installed-application flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID from the Google Cloud console
    pub client_id: String,
    /// Client secret; Google issues one even for installed applications
    pub client_secret: Option<String>,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config for Google with the Drive scope
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Sets the client secret
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Creates a config with a custom redirect URI
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Points the flow at different endpoints (useful for testing)
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// OAuth token set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token sent with every Drive request
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// When `access_token` stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token expires within `window`
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at <= Utc::now() + window
    }
}

// ============================================================================
// TokenFile
// ============================================================================

/// JSON token store on the local filesystem
///
/// The file is created with owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Creates a store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads tokens
    ///
    /// # Returns
    /// `Some(Tokens)` if the file exists and parses, `None` if it does not exist
    pub fn load(&self) -> Result<Option<Tokens>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file found");
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Failed to read token file {}",
                    self.path.display()
                )))
            }
        };

        let tokens: Tokens = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse token file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Loaded tokens");
        Ok(Some(tokens))
    }

    /// Writes tokens, replacing any previous content
    pub fn store(&self, tokens: &Tokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create token directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        use std::io::Write;
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open token file {}", self.path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Stored tokens");
        Ok(())
    }
}

// ============================================================================
// InstalledAppFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct InstalledAppFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
    scopes: Vec<String>,
    redirect_uri: String,
}

impl InstalledAppFlow {
    /// Creates a new flow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            )
            .set_auth_type(AuthType::RequestBody);
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        // The token endpoint must not be allowed to redirect credentials
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            http,
            scopes: config.scopes.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access so the response carries a refresh token.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .context("Failed to exchange authorization code")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: expiry(token_result.expires_in()),
        };

        if tokens.refresh_token.is_none() {
            warn!("Authorization server did not return a refresh token");
        }
        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Obtains a new access token using a refresh token
    ///
    /// Google usually omits the refresh token from the response; the
    /// previous one is kept in that case.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        debug!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh token")?;

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry(token_result.expires_in()),
        })
    }

    /// Runs the interactive login: browser, local callback, code exchange
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");

        let (auth_url, csrf_token, pkce_verifier) = self.generate_auth_url();
        let server = LocalCallbackServer::bind(&self.redirect_uri).await?;

        info!("Opening browser for authentication");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Could not open a browser");
        }
        // Headless hosts need the URL to complete login elsewhere
        info!(url = %auth_url, "Visit this URL to authorize drivemirror");

        let callback = server.wait().await?;
        if callback.state != *csrf_token.secret() {
            anyhow::bail!("OAuth callback state does not match the issued CSRF token");
        }

        let tokens = self.exchange_code(callback.code, pkce_verifier).await?;
        info!("OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }
}

fn expiry(expires_in: Option<StdDuration>) -> DateTime<Utc> {
    let secs = expires_in
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Utc::now() + Duration::seconds(secs)
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on loopback for the OAuth2 redirect.
///
/// Serves every incoming connection until one request carries an
/// authorization code, answers it with a success page, then stops.
pub struct LocalCallbackServer {
    listener: tokio::net::TcpListener,
}

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Binds to the host and port of `redirect_uri`
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = url::Url::parse(redirect_uri).context("Invalid redirect URI")?;
        let host = url.host_str().unwrap_or("127.0.0.1");
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        info!(%addr, "Started local OAuth callback server");
        Ok(Self { listener })
    }

    /// Waits for the OAuth redirect
    ///
    /// # Returns
    /// The callback parameters (code and state) extracted from the redirect URL
    pub async fn wait(self) -> Result<CallbackParams> {
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::sync::{oneshot, Mutex};

        let (tx, mut rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        loop {
            tokio::select! {
                params = &mut rx => {
                    let params = params
                        .context("Callback server channel closed without receiving parameters")?;
                    info!("Received OAuth callback with authorization code");
                    return Ok(params);
                }
                accepted = self.listener.accept() => {
                    let (stream, _addr) =
                        accepted.context("Failed to accept connection on callback server")?;
                    let io = TokioIo::new(stream);
                    let tx = tx.clone();

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let uri = req.uri().to_string();
                            debug!(%uri, "Callback server received request");

                            let response = match parse_callback_params(&uri) {
                                Some(params) => {
                                    if let Some(sender) = tx.lock().await.take() {
                                        let _ = sender.send(params);
                                    }
                                    html_response(StatusCode::OK, success_html())
                                }
                                None => html_response(
                                    StatusCode::BAD_REQUEST,
                                    error_html("Missing authorization code in callback"),
                                ),
                            };
                            Ok::<_, hyper::Error>(response)
                        }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            warn!(error = %e, "Callback server connection error");
                        }
                    });
                }
            }
        }
    }
}

fn html_response(
    status: hyper::StatusCode,
    html: String,
) -> hyper::Response<http_body_util::Full<hyper::body::Bytes>> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};

    let mut response = hyper::Response::new(http_body_util::Full::new(hyper::body::Bytes::from(html)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>drivemirror - Authorization Complete</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Complete</h1>
    <p>drivemirror can now write to your Google Drive.</p>
    <p>You can close this window.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>drivemirror - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// CredentialManager
// ============================================================================

/// Owns the token file and produces authenticated remote stores
///
/// 1. [`initial_tokens`](Self::initial_tokens) loads saved tokens, runs the
///    interactive login on first use, and refreshes stale tokens
/// 2. [`build_store`](Self::build_store) wraps an access token in a
///    [`DriveRemoteStore`]
/// 3. [`renewal_loop`](Self::renewal_loop) keeps the shared transport
///    supplied with a valid token until shutdown
pub struct CredentialManager {
    flow: InstalledAppFlow,
    token_file: TokenFile,
    request_timeout: StdDuration,
    max_retries: u32,
    api_base_url: Option<String>,
}

impl CredentialManager {
    /// Creates a manager from its parts
    pub fn new(config: &OAuth2Config, token_file: TokenFile) -> Result<Self> {
        Ok(Self {
            flow: InstalledAppFlow::new(config)?,
            token_file,
            request_timeout: StdDuration::from_secs(30),
            max_retries: 5,
            api_base_url: None,
        })
    }

    /// Creates a manager from the `auth` and `drive` config sections
    ///
    /// # Errors
    /// Fails if `auth.client_id` is not set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client_id = config
            .auth
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("auth.client_id is not configured")?;

        let mut oauth = OAuth2Config::new(client_id);
        if let Some(secret) = &config.auth.client_secret {
            oauth = oauth.with_client_secret(secret.clone());
        }

        Ok(Self::new(&oauth, TokenFile::new(&config.auth.token_file))?
            .with_request_settings(
                StdDuration::from_secs(config.drive.request_timeout_secs),
                config.drive.max_retries,
            ))
    }

    /// Sets the timeout and retry budget of stores built by this manager
    pub fn with_request_settings(mut self, timeout: StdDuration, max_retries: u32) -> Self {
        self.request_timeout = timeout;
        self.max_retries = max_retries;
        self
    }

    /// Points built stores at a custom API server (useful for testing)
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    /// The token file backing this manager
    pub fn token_file(&self) -> &TokenFile {
        &self.token_file
    }

    /// Returns usable tokens for startup
    ///
    /// Loads the token file; without one, runs the interactive login and
    /// persists the result. Tokens about to expire are refreshed first.
    pub async fn initial_tokens(&self) -> Result<Tokens> {
        let tokens = match self.token_file.load()? {
            Some(tokens) => tokens,
            None => {
                info!("No saved credentials, starting interactive login");
                let tokens = self.flow.login().await?;
                self.token_file.store(&tokens)?;
                return Ok(tokens);
            }
        };

        match self
            .renew(&tokens, Duration::seconds(STARTUP_REFRESH_MARGIN_SECS))
            .await?
        {
            Some(renewed) => Ok(renewed),
            None => Ok(tokens),
        }
    }

    /// Builds a remote store authenticated with `tokens`
    pub fn build_store(&self, tokens: &Tokens) -> Result<SharedStore> {
        let mut builder = DriveClient::builder(tokens.access_token.clone())
            .timeout(self.request_timeout)
            .max_retries(self.max_retries);
        if let Some(base) = &self.api_base_url {
            builder = builder.base_url(base.clone());
        }
        Ok(Arc::new(DriveRemoteStore::new(builder.build()?)))
    }

    /// Refreshes `tokens` if they expire within `horizon`
    ///
    /// # Returns
    /// `Some(new_tokens)`, already persisted, when the access token changed;
    /// `None` when no refresh was needed or the server returned the same token
    pub async fn renew(&self, tokens: &Tokens, horizon: Duration) -> Result<Option<Tokens>> {
        if !tokens.expires_within(horizon) {
            debug!(expires_at = %tokens.expires_at, "Access token still valid");
            return Ok(None);
        }

        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .context("Access token is expiring and no refresh token is available")?;

        let renewed = self.flow.refresh_token(refresh_token).await?;
        if renewed.access_token == tokens.access_token {
            return Ok(None);
        }

        self.token_file.store(&renewed)?;
        info!(expires_at = %renewed.expires_at, "Access token renewed");
        Ok(Some(renewed))
    }

    /// Renews credentials every `interval` until `shutdown` is cancelled
    ///
    /// A new access token is persisted and a store built on it replaces the
    /// active one in `swap`. Failures are logged and retried on the next
    /// tick; the previous store stays active meanwhile.
    pub async fn renewal_loop(
        &self,
        mut tokens: Tokens,
        swap: TransportSwap,
        interval: StdDuration,
        shutdown: CancellationToken,
    ) {
        // Refresh anything that would expire before the next check
        let horizon = Duration::from_std(interval).unwrap_or(Duration::zero())
            + Duration::seconds(STARTUP_REFRESH_MARGIN_SECS);

        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Credential renewal loop started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Credential renewal loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.renew(&tokens, horizon).await {
                Ok(Some(renewed)) => match self.build_store(&renewed) {
                    Ok(store) => {
                        swap.replace(store);
                        tokens = renewed;
                    }
                    Err(e) => error!(error = %e, "Failed to build store for renewed token"),
                },
                Ok(None) => debug!("No credential renewal needed"),
                Err(e) => error!(error = %format!("{e:#}"), "Credential renewal failed"),
            }
        }
    }
}
