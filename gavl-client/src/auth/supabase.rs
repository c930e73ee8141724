//! Identity service backed by a hosted Supabase project (GoTrue + PostgREST).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::identity::{
    Filter, IdentityService, ResendRequest, SignUpRequest, SignUpResponse, UserAttributes,
};
use crate::auth::session::{Session, User};
use crate::{Error, Result};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Sign-up returns a session when email confirmation is disabled,
/// otherwise just the pending user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(Session),
    User(User),
}

/// Client for a Supabase project's auth and REST endpoints.
pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// Attach the project key and the caller's bearer token.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());

        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Token grants authenticate as the project, never as a stored session.
    fn authorize_anon(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn store_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let response = self.authorize_anon(request).send().await?;
        let session: Session = read_json(response).await?;
        info!(user_id = %session.user.id, "Session refreshed");
        Ok(session)
    }
}

/// Decode a success body or turn an error body into [`Error::Identity`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check(response).await?;
    Ok(response.json::<T>().await?)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Identity {
        status: Some(status.as_u16()),
        message: error_message(status.as_u16(), &body),
    })
}

/// First of `error_description`, `msg`, `message`, `error`.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

fn with_redirect(request: RequestBuilder, redirect_to: Option<&str>) -> RequestBuilder {
    match redirect_to {
        Some(url) => request.query(&[("redirect_to", url)]),
        None => request,
    }
}

fn filtered(request: RequestBuilder, filter: &Filter) -> RequestBuilder {
    request.query(&[
        (filter.column.as_str(), format!("eq.{}", filter.value).as_str()),
        ("select", "*"),
    ])
}

#[async_trait]
impl IdentityService for SupabaseClient {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse> {
        let http_request = with_redirect(
            self.http.post(self.auth_url("signup")),
            request.email_redirect_to.as_deref(),
        )
        .json(&request);
        let response = self.authorize(http_request).await.send().await?;

        match read_json::<SignUpBody>(response).await? {
            SignUpBody::Session(session) => {
                let user = session.user.clone();
                self.store_session(Some(session.clone())).await;
                Ok(SignUpResponse {
                    user,
                    session: Some(session),
                })
            }
            SignUpBody::User(user) => Ok(SignUpResponse {
                user,
                session: None,
            }),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.authorize_anon(request).send().await?;

        let session: Session = read_json(response).await?;
        self.store_session(Some(session.clone())).await;
        Ok(session)
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            debug!("Stored session expired with no refresh token");
            self.store_session(None).await;
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(refreshed) => {
                self.store_session(Some(refreshed.clone())).await;
                Ok(Some(refreshed))
            }
            Err(e) => {
                self.store_session(None).await;
                Err(e)
            }
        }
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session.read().await.is_none() {
            return Ok(());
        }

        let request = self.authorize(self.http.post(self.auth_url("logout"))).await;
        let result = check(request.send().await?).await;
        self.store_session(None).await;

        match result {
            Ok(_) => Ok(()),
            // Token already revoked or unknown upstream: the local session is gone either way.
            Err(Error::Identity { status: Some(401 | 403 | 404), message }) => {
                warn!(reason = %message, "Sign-out on expired session");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let request = with_redirect(self.http.post(self.auth_url("recover")), redirect_to)
            .json(&json!({ "email": email }));
        check(self.authorize(request).await.send().await?).await?;
        Ok(())
    }

    async fn update_user(&self, attributes: UserAttributes) -> Result<User> {
        if self.session.read().await.is_none() {
            return Err(Error::identity("Auth session missing!"));
        }

        let request = self.http.put(self.auth_url("user")).json(&attributes);
        let user: User = read_json(self.authorize(request).await.send().await?).await?;

        if let Some(session) = self.session.write().await.as_mut() {
            session.user = user.clone();
        }
        Ok(user)
    }

    async fn resend(&self, request: ResendRequest) -> Result<()> {
        let http_request = with_redirect(
            self.http.post(self.auth_url("resend")),
            request.email_redirect_to.as_deref(),
        )
        .json(&request);
        check(self.authorize(http_request).await.send().await?).await?;
        Ok(())
    }

    async fn select_single(&self, table: &str, filter: &Filter) -> Result<Value> {
        let request = filtered(self.http.get(self.rest_url(table)), filter)
            .header("Accept", SINGLE_OBJECT);
        read_json(self.authorize(request).await.send().await?).await
    }

    async fn insert_single(&self, table: &str, row: Value) -> Result<Value> {
        let request = self
            .http
            .post(self.rest_url(table))
            .query(&[("select", "*")])
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(&row);
        read_json(self.authorize(request).await.send().await?).await
    }

    async fn update_single(&self, table: &str, filter: &Filter, updates: Value) -> Result<Value> {
        let request = filtered(self.http.patch(self.rest_url(table)), filter)
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(&updates);
        read_json(self.authorize(request).await.send().await?).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=minimal")
            .json(&rows);
        check(self.authorize(request).await.send().await?).await?;
        Ok(())
    }
}
