//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::auth::identity::{
    Filter, IdentityService, ResendRequest, SignUpRequest, SignUpResponse, UserAttributes,
};
use crate::auth::session::{Session, User};
use crate::ip::IpLookup;
use crate::{Error, Result};

// ── Local HTTP responder ─────────────────────────────────────────────────────

/// Answer a single request with `status` and a JSON `body`; returns the base URL.
pub(crate) async fn serve_once(status: u16, body: &str) -> String {
    serve_capture(status, body).await.0
}

/// Like [`serve_once`], also yielding the raw request text.
pub(crate) async fn serve_capture(status: u16, body: &str) -> (String, oneshot::Receiver<String>) {
    let (base, mut requests) = serve_sequence(vec![(status, body)]).await;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Some(request) = requests.recv().await {
            let _ = tx.send(request);
        }
    });
    (base, rx)
}

/// Answer one connection per `(status, body)` in order, reporting each raw
/// request as it is served.
pub(crate) async fn serve_sequence(
    responses: Vec<(u16, &str)>,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responses: Vec<(u16, String)> = responses
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            let _ = tx.send(request);
        }
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        406 => "Not Acceptable",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

// ── IP lookup ────────────────────────────────────────────────────────────────

/// `Some(ip)` answers with `ip`; `None` always fails.
pub(crate) struct FixedIp(pub Option<&'static str>);

#[async_trait]
impl IpLookup for FixedIp {
    async fn lookup(&self) -> Result<String> {
        self.0
            .map(String::from)
            .ok_or_else(|| Error::Status {
                status: 503,
                reason: "Service Unavailable".to_string(),
            })
    }
}

// ── Identity service ─────────────────────────────────────────────────────────

const NO_SINGLE_ROW: &str = "JSON object requested, multiple (or no) rows returned";

/// In-memory identity provider and table store.
#[derive(Default)]
pub(crate) struct MemoryIdentity {
    accounts: Mutex<HashMap<String, (String, User)>>,
    session: Mutex<Option<Session>>,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    /// Returned verbatim by every sign-in attempt when set
    sign_in_error: Mutex<Option<String>>,
    failing_tables: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryIdentity {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_sign_in(&self, message: &str) {
        *self.sign_in_error.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn fail_table(&self, table: &str) {
        self.failing_tables.lock().unwrap().push(table.to_string());
    }

    pub(crate) fn seed(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_table(&self, table: &str) -> Result<()> {
        if self.failing_tables.lock().unwrap().iter().any(|t| t == table) {
            return Err(Error::identity(format!("relation \"{}\" does not exist", table)));
        }
        Ok(())
    }

    pub(crate) fn session_for(user: User) -> Session {
        Session {
            access_token: format!("token-{}", user.id),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            refresh_token: None,
            user,
        }
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => *s == filter.value,
        Some(other) => other.to_string() == filter.value,
        None => false,
    }
}

fn no_single_row() -> Error {
    Error::Identity {
        status: Some(406),
        message: NO_SINGLE_ROW.to_string(),
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse> {
        self.record(format!(
            "sign_up:{}:{}",
            request.email,
            request.email_redirect_to.clone().unwrap_or_default()
        ));

        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&request.email) {
            return Err(Error::identity("User already registered"));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(request.email.clone()),
            email_confirmed_at: None,
            user_metadata: request.data,
            created_at: None,
            extra: Map::new(),
        };
        accounts.insert(request.email, (request.password, user.clone()));
        Ok(SignUpResponse { user, session: None })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.record(format!("sign_in:{}", email));
        if let Some(message) = self.sign_in_error.lock().unwrap().clone() {
            return Err(Error::identity(message));
        }

        let accounts = self.accounts.lock().unwrap();
        let session = match accounts.get(email) {
            Some((stored, user)) if stored == password => Self::session_for(user.clone()),
            _ => return Err(Error::identity("Invalid login credentials")),
        };
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_out(&self) -> Result<()> {
        self.record("sign_out".to_string());
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        self.record(format!("recover:{}:{}", email, redirect_to.unwrap_or_default()));
        Ok(())
    }

    async fn update_user(&self, attributes: UserAttributes) -> Result<User> {
        let session = self.session.lock().unwrap().clone();
        let Some(session) = session else {
            return Err(Error::identity("Auth session missing!"));
        };

        let mut accounts = self.accounts.lock().unwrap();
        if let (Some(email), Some(password)) = (session.user.email.as_ref(), attributes.password) {
            if let Some(account) = accounts.get_mut(email) {
                account.0 = password;
            }
        }
        Ok(session.user)
    }

    async fn resend(&self, request: ResendRequest) -> Result<()> {
        self.record(format!(
            "resend:{}:{}",
            serde_json::to_value(request.kind)?.as_str().unwrap_or_default(),
            request.email
        ));
        Ok(())
    }

    async fn select_single(&self, table: &str, filter: &Filter) -> Result<Value> {
        self.check_table(table)?;
        let tables = self.tables.lock().unwrap();
        let found: Vec<&Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| matches(row, filter)).collect())
            .unwrap_or_default();

        match found.as_slice() {
            [row] => Ok((*row).clone()),
            _ => Err(no_single_row()),
        }
    }

    async fn insert_single(&self, table: &str, row: Value) -> Result<Value> {
        self.check_table(table)?;
        let mut row = row;
        if let Value::Object(map) = &mut row {
            map.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }
        self.seed(table, row.clone());
        Ok(row)
    }

    async fn update_single(&self, table: &str, filter: &Filter, updates: Value) -> Result<Value> {
        self.check_table(table)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.get_mut(table).ok_or_else(no_single_row)?;
        let row = rows
            .iter_mut()
            .find(|row| matches(row, filter))
            .ok_or_else(no_single_row)?;

        if let (Value::Object(target), Value::Object(changes)) = (&mut *row, updates) {
            target.extend(changes);
        }
        Ok(row.clone())
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        self.check_table(table)?;
        for row in rows {
            self.seed(table, row);
        }
        Ok(())
    }
}
