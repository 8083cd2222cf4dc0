use std::net::Ipv4Addr;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use log::{debug, info, warn};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, PkceCodeChallenge, RedirectUrl, RefreshToken, RequestTokenError, Scope,
    TokenUrl,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use super::secrets::ClientSecrets;
use super::token::StoredToken;
use super::{AuthError, Authorizer};

type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const REDIRECT_PAGE: &str = "<html><body><p>The authentication flow has completed. \
You may close this window.</p></body></html>";

/// How long the redirect listener may take to finish open connections.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// [`Authorizer`] talking to Google's OAuth2 endpoints over a blocking
/// HTTP client.
pub struct GoogleAuthorizer {
    http: reqwest::blocking::Client,
}

impl GoogleAuthorizer {
    pub fn new(http: reqwest::blocking::Client) -> Self {
        Self { http }
    }
}

impl Authorizer for GoogleAuthorizer {
    fn refresh(&self, secrets: &ClientSecrets, token: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = token.refresh_token.clone().ok_or(AuthError::MissingRefreshToken)?;

        let resp = build_client(secrets)?
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request(&self.http)?;

        info!("access token refreshed");
        Ok(StoredToken::from_response(&resp, Utc::now()))
    }

    /// Installed-app consent flow with a loopback redirect.
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<StoredToken, AuthError> {
        // the blocking token exchange below must run outside this runtime
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let listener = runtime.block_on(TcpListener::bind((Ipv4Addr::LOCALHOST, 0)))?;
        let port = listener.local_addr()?.port();
        let redirect = RedirectUrl::new(format!("http://{}:{}/", Ipv4Addr::LOCALHOST, port))?;

        let client = build_client(secrets)?.set_redirect_uri(redirect);
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(challenge)
            .url();

        // stdout belongs to the parent process
        eprintln!("Please visit this URL to authorize this application: {auth_url}");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("could not open a browser, use the URL above: {}", e);
        }
        info!("waiting for the OAuth redirect on port {}", port);

        let params = runtime.block_on(wait_for_redirect(listener))?;
        drop(runtime);
        let code = params.into_code(csrf.secret())?;

        let resp = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request(&self.http)?;

        info!("authorization code exchanged for tokens");
        Ok(StoredToken::from_response(&resp, Utc::now()))
    }
}

fn build_client(secrets: &ClientSecrets) -> Result<GoogleClient, AuthError> {
    let mut client = BasicClient::new(ClientId::new(secrets.client_id.clone()))
        .set_auth_uri(AuthUrl::new(secrets.auth_uri.clone())?)
        .set_token_uri(TokenUrl::new(secrets.token_uri.clone())?);
    if let Some(secret) = &secrets.client_secret {
        client = client.set_client_secret(ClientSecret::new(secret.clone()));
    }
    Ok(client)
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl RedirectParams {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }

    /// Check the CSRF state and extract the authorization code.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::ConsentDenied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        self.code
            .ok_or_else(|| AuthError::BadRedirect("missing `code` parameter".into()))
    }
}

/// Serve `listener` until a request carrying the OAuth redirect parameters
/// arrives, then shut the server down and return them.
///
/// Other requests (`/favicon.ico`, a bare `/`, idle preconnects) do not end
/// the wait.
pub async fn wait_for_redirect(listener: TcpListener) -> Result<RedirectParams, AuthError> {
    let (redirect_tx, mut redirect_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(receive_redirect))
        .with_state(redirect_tx);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            })
            .await
    });

    // None only if the server stopped, dropping the sender with the router
    let params = redirect_rx.recv().await;
    shutdown_tx.send(()).ok();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Err(e))) => debug!("redirect listener stopped with {}", e),
        Ok(Err(e)) => debug!("redirect listener task failed: {}", e),
        Err(_) => debug!("redirect listener still had open connections"),
        Ok(Ok(Ok(()))) => {}
    }

    params.ok_or_else(|| AuthError::BadRedirect("listener stopped before the redirect arrived".into()))
}

async fn receive_redirect(
    State(redirect_tx): State<mpsc::Sender<RedirectParams>>,
    Query(params): Query<RedirectParams>,
) -> Response {
    if params.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }
    if redirect_tx.try_send(params).is_err() {
        debug!("ignoring a repeated OAuth redirect");
    }
    Html(REDIRECT_PAGE).into_response()
}

impl From<RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>> for AuthError {
    fn from(e: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                let mut message = err.error().to_string();
                if let Some(description) = err.error_description() {
                    message = format!("{message} ({description})");
                }
                AuthError::Server(message)
            }
            RequestTokenError::Request(req_e) => AuthError::Transport(req_e.to_string()),
            RequestTokenError::Parse(parse_err, _body) => AuthError::TokenParse(parse_err.to_string()),
            RequestTokenError::Other(s) => AuthError::Transport(s),
        }
    }
}
