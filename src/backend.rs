//! Client for the bank-aggregation backend.
//!
//! The backend owns the third-party link widget and exposes four JSON
//! endpoints. Requests go through a [`Transport`] so the client can be driven by
//! any HTTP stack, or by canned responses in tests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    errors::{Error, Result},
    session::Session,
    types::{Account, AccountKind, Money},
};

/// Institution tag for linked accounts whose institution was not reported
pub const LINKED_INSTITUTION: &str = "linked";

/// How long [`HttpTransport`] waits for a whole request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters escaped in a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Status line and body of a backend response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, expected to be JSON
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request/response round trip to the backend.
///
/// Implementations return [`Error::Network`] when no response was received at all.
pub trait Transport {
    /// Sends a GET request
    /// # Errors
    /// [`Error::Network`] if the request could not be completed
    fn get(&mut self, url: &str) -> Result<HttpResponse>;

    /// Sends a POST request with a JSON body
    /// # Errors
    /// [`Error::Network`] if the request could not be completed
    fn post(&mut self, url: &str, json: &str) -> Result<HttpResponse>;
}

/// Blocking [`Transport`] over a `ureq` agent
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// A transport giving up on any request after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn finish(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<HttpResponse> {
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(Error::network(err.to_string())),
        };
        let status = response.status();
        let body = response.into_string()?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str) -> Result<HttpResponse> {
        Self::finish(self.agent.get(url).call())
    }

    fn post(&mut self, url: &str, json: &str) -> Result<HttpResponse> {
        Self::finish(
            self.agent
                .post(url)
                .set("Content-Type", "application/json")
                .send_string(json),
        )
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct LinkTokenRequest<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    public_token: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct AccountsResponse {
    accounts: Vec<WireAccount>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    account_id: String,
    name: String,
    #[serde(default)]
    balances: WireBalances,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    institution_name: Option<String>,
    #[serde(default)]
    mask: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireBalances {
    current: Option<f64>,
}

impl WireAccount {
    fn into_account(self, now: DateTime<Utc>) -> Result<Account> {
        let balance = match self.balances.current {
            Some(current) => Money::from(Decimal::try_from(current).map_err(|_| {
                Error::validation(format!("balance {current} for account {}", self.account_id))
            })?),
            None => Money::ZERO,
        };
        let kind = match (self.kind.as_deref(), self.subtype.as_deref()) {
            (Some("credit"), _) => AccountKind::Credit,
            (_, Some("savings")) => AccountKind::Savings,
            _ => AccountKind::Checking,
        };
        Ok(Account {
            id: self.account_id.into(),
            name: self.name,
            institution: self
                .institution_name
                .unwrap_or_else(|| LINKED_INSTITUTION.to_string()),
            balance,
            kind,
            mask: self.mask.unwrap_or_default(),
            last_sync: now,
        })
    }
}

/// Thin JSON client over a [`Transport`]
#[derive(Debug)]
pub struct BackendClient<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> BackendClient<T> {
    /// Creates a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Backend root, without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn decode<D: DeserializeOwned>(path: &str, response: HttpResponse) -> Result<D> {
        if !response.is_success() {
            warn!(path, status = response.status, "backend request failed");
            return Err(Error::Network {
                status: Some(response.status),
                message: format!("{path} returned {}", response.status),
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    fn get<D: DeserializeOwned>(&mut self, path: &str) -> Result<D> {
        let response = self.transport.get(&self.url(path))?;
        Self::decode(path, response)
    }

    fn post<B: Serialize, D: DeserializeOwned>(&mut self, path: &str, body: &B) -> Result<D> {
        let json = serde_json::to_string(body)?;
        let response = self.transport.post(&self.url(path), &json)?;
        Self::decode(path, response)
    }

    /// `GET /health`, returning the reported status
    /// # Errors
    /// [`Error::Network`] on transport failure or a non-2xx status,
    /// [`Error::Json`] on an unexpected body
    pub fn health(&mut self) -> Result<String> {
        let health: HealthResponse = self.get("/health")?;
        Ok(health.status)
    }

    /// `POST /api/create_link_token`, returning the token that opens the link widget
    /// # Errors
    /// [`Error::Network`] on transport failure or a non-2xx status,
    /// [`Error::Json`] on an unexpected body
    pub fn create_link_token(&mut self, user_id: &str) -> Result<String> {
        let response: LinkTokenResponse =
            self.post("/api/create_link_token", &LinkTokenRequest { user_id })?;
        Ok(response.link_token)
    }

    /// `POST /api/exchange_public_token` with the token the link widget handed back
    /// # Errors
    /// [`Error::Network`] on transport failure, a non-2xx status or `success: false`;
    /// [`Error::Json`] on an unexpected body
    pub fn exchange_public_token(&mut self, public_token: &str, user_id: &str) -> Result<()> {
        let response: ExchangeResponse = self.post(
            "/api/exchange_public_token",
            &ExchangeRequest {
                public_token,
                user_id,
            },
        )?;
        if response.success {
            Ok(())
        } else {
            let message = response
                .error
                .unwrap_or_else(|| "token exchange was rejected".to_string());
            warn!(%message, "public token exchange failed");
            Err(Error::Network {
                status: None,
                message,
            })
        }
    }

    /// `GET /api/accounts/{user_id}`, converted into session accounts synced at `now`
    /// # Errors
    /// [`Error::Network`] on transport failure or a non-2xx status,
    /// [`Error::Json`] on an unexpected body, [`Error::Validation`] on an unrepresentable balance
    pub fn accounts(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<Account>> {
        let user_id = utf8_percent_encode(user_id, PATH_SEGMENT);
        let response: AccountsResponse = self.get(&format!("/api/accounts/{user_id}"))?;
        response
            .accounts
            .into_iter()
            .map(|account| account.into_account(now))
            .collect()
    }
}

/// Where a [`LinkFlow`] stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing requested yet
    Idle,
    /// A link token was issued; waiting for the widget's public token
    TokenIssued(String),
    /// The public token was exchanged
    Linked,
    /// Accounts were fetched into the session
    Synced(usize),
    /// A step failed; the flow must be restarted
    Failed(String),
}

/// The create-token, exchange, fetch sequence, one step at a time.
///
/// Each step needs the state the previous one left behind, so at most one
/// request is ever in flight. Any failure parks the flow in [`LinkState::Failed`]
/// until [`LinkFlow::restart`] is called.
#[derive(Debug)]
pub struct LinkFlow {
    user_id: String,
    state: LinkState,
}

impl LinkFlow {
    /// A new idle flow for `user_id`
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: LinkState::Idle,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Returns to [`LinkState::Idle`]
    pub fn restart(&mut self) {
        self.state = LinkState::Idle;
    }

    fn out_of_order(&self, step: &str) -> Error {
        Error::validation(format!("link step '{step}' in state {:?}", self.state))
    }

    fn record<V>(&mut self, result: Result<V>) -> Result<V> {
        if let Err(err) = &result {
            self.state = LinkState::Failed(err.to_string());
        }
        result
    }

    /// Requests a link token. Only valid when idle.
    /// # Errors
    /// [`Error::Validation`] out of order, otherwise any client error
    pub fn start<T: Transport>(&mut self, client: &mut BackendClient<T>) -> Result<String> {
        if self.state != LinkState::Idle {
            return Err(self.out_of_order("start"));
        }
        let token = self.record(client.create_link_token(&self.user_id))?;
        self.state = LinkState::TokenIssued(token.clone());
        Ok(token)
    }

    /// Exchanges the public token returned by the link widget
    /// # Errors
    /// [`Error::Validation`] out of order, otherwise any client error
    pub fn complete<T: Transport>(
        &mut self,
        client: &mut BackendClient<T>,
        public_token: &str,
    ) -> Result<()> {
        if !matches!(self.state, LinkState::TokenIssued(_)) {
            return Err(self.out_of_order("complete"));
        }
        self.record(client.exchange_public_token(public_token, &self.user_id))?;
        self.state = LinkState::Linked;
        Ok(())
    }

    /// Fetches linked accounts and replaces the session's accounts with them.
    /// Can be repeated once synced to refresh.
    /// # Errors
    /// [`Error::Validation`] out of order, otherwise any client error
    pub fn sync<T: Transport>(
        &mut self,
        client: &mut BackendClient<T>,
        session: &mut Session,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if !matches!(self.state, LinkState::Linked | LinkState::Synced(_)) {
            return Err(self.out_of_order("sync"));
        }
        let accounts = self.record(client.accounts(&self.user_id, now))?;
        let count = accounts.len();
        session.replace_accounts(accounts);
        info!(accounts = count, user = %self.user_id, "synced linked accounts");
        self.state = LinkState::Synced(count);
        Ok(count)
    }
}
