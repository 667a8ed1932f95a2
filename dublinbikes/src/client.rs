use crate::config::{Config, TAKN_SCHEME};
use crate::error::{Error, Result, Step};
use crate::identifiers::AccountId;
use crate::models::{
    AccessToken, ClientTokenRequest, ClientTokens, OAuthTokenSet, RefreshRequest, Trip,
};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use log::{debug, info};
use reqwest::header::{self, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

/// What a user types in to log in.
#[derive(Clone)]
pub struct Credentials {
    pub account_id: AccountId,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tokens and identity of one logged-in account. Lives only in memory.
#[derive(Clone)]
pub struct Session {
    account_id: AccountId,
    email: String,
    password: String,
    access_token: String,
    client_refresh_token: String,
    oauth_refresh_token: String,
    id_token: String,
    token_type: String,
    scope: String,
    expires_in: u64,
}

impl Session {
    fn new(credentials: Credentials) -> Self {
        Session {
            account_id: credentials.account_id,
            email: credentials.email,
            password: credentials.password,
            access_token: String::new(),
            client_refresh_token: String::new(),
            oauth_refresh_token: String::new(),
            id_token: String::new(),
            token_type: String::new(),
            scope: String::new(),
            expires_in: 0,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Token sent as `Authorization` on API calls; replaced on every refresh.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn client_refresh_token(&self) -> &str {
        &self.client_refresh_token
    }

    pub fn oauth_refresh_token(&self) -> &str {
        &self.oauth_refresh_token
    }

    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Logged-in client for one account's trip history.
///
/// A value of this type only exists once the whole authentication sequence went through:
///
/// 1. client token (`/auth/environments/PRD/client_tokens`)
/// 2. login, which answers with a 302 carrying an authorization code
/// 3. code exchange (`/identities/token`)
/// 4. access token refresh (`/auth/access_tokens`)
///
/// If any later call returns an error the client should be dropped.
#[derive(Debug)]
pub struct TripClient<T = ReqwestTransport> {
    transport: T,
    config: Config,
    session: Session,
}

impl TripClient<ReqwestTransport> {
    /// Authenticates over the network using a reqwest blocking client built from `config`.
    pub fn connect(config: Config, credentials: Credentials) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent, config.timeout).map_err(|e| {
            Error::Request {
                step: Step::ClientToken,
                reason: format!("building HTTP client: {e}"),
            }
        })?;
        Self::with_transport(transport, config, credentials)
    }
}

impl<T: Transport> TripClient<T> {
    /// Runs the four authentication steps in order over `transport`, stopping at the first
    /// failure.
    pub fn with_transport(transport: T, config: Config, credentials: Credentials) -> Result<Self> {
        let mut client = TripClient {
            transport,
            config,
            session: Session::new(credentials),
        };
        client.authenticate_client()?;
        let code = client.login()?;
        client.exchange_code_for_token(&code)?;
        // the web app also refreshes immediately after the exchange
        client.refresh_access_token()?;
        info!("authenticated account {}", client.session.account_id);
        Ok(client)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authenticate_client(&mut self) -> Result<()> {
        let step = Step::ClientToken;
        let body = to_json(
            step,
            &ClientTokenRequest {
                code: self.config.client_code.clone(),
                key: self.config.client_key.clone(),
            },
        )?;
        let url = self.endpoint(step, "/auth/environments/PRD/client_tokens")?;
        let response = self.send(step, HttpRequest::new(Method::POST, url).json_body(body))?;
        expect_status(step, StatusCode::OK, &response)?;
        let tokens: ClientTokens = decode(step, &response.body)?;
        self.session.access_token = tokens.accessToken;
        self.session.client_refresh_token = tokens.refreshToken;
        Ok(())
    }

    /// Logs the user in and returns the authorization code from the redirect.
    fn login(&self) -> Result<String> {
        let step = Step::Login;
        let mut url = self.endpoint(step, "/identities/users/login")?;
        // NOTE: the password goes in the query string; that is how the identity service takes it
        url.query_pairs_mut()
            .append_pair("takn", &self.session.access_token)
            .append_pair("email", &self.session.email)
            .append_pair("password", &self.session.password)
            .append_pair("redirect_uri", &self.config.redirect_uri);
        let response = self.send(step, HttpRequest::new(Method::GET, url.clone()))?;
        expect_status(step, StatusCode::FOUND, &response)?;
        let location = response
            .headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingLocation)?;
        code_from_location(&url, location)
    }

    fn exchange_code_for_token(&mut self, code: &str) -> Result<()> {
        let step = Step::TokenExchange;
        let mut url = self.endpoint(step, "/identities/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", &self.config.redirect_uri);
        let request = HttpRequest::new(Method::POST, url)
            .header(header::AUTHORIZATION, self.takn_authorization(step)?)
            .json_body(b"{}".to_vec());
        let response = self.send(step, request)?;
        expect_status(step, StatusCode::OK, &response)?;
        let tokens: OAuthTokenSet = decode(step, &response.body)?;
        self.session.access_token = tokens.access_token;
        self.session.oauth_refresh_token = tokens.refresh_token;
        self.session.id_token = tokens.id_token;
        self.session.expires_in = tokens.expires_in;
        self.session.scope = tokens.scope;
        self.session.token_type = tokens.token_type;
        Ok(())
    }

    /// Mints a new access token from the client refresh token and makes it the working token.
    pub fn refresh_access_token(&mut self) -> Result<()> {
        let step = Step::Refresh;
        let body = to_json(
            step,
            &RefreshRequest {
                refreshToken: self.session.client_refresh_token.clone(),
            },
        )?;
        let url = self.endpoint(step, "/auth/access_tokens")?;
        let response = self.send(step, HttpRequest::new(Method::POST, url).json_body(body))?;
        expect_status(step, StatusCode::OK, &response)?;
        let token: AccessToken = decode(step, &response.body)?;
        self.session.access_token = token.accessToken;
        Ok(())
    }

    /// Fetches the complete trip history, in the order the server returns it.
    ///
    /// Always refreshes the access token first, without looking at its expiry.
    pub fn fetch_trips(&mut self) -> Result<Vec<Trip>> {
        self.refresh_access_token()?;

        let step = Step::Trips;
        let mut url = self.endpoint(step, "")?;
        // one segment each, so contract and account id are percent-encoded rather than parsed
        url.path_segments_mut()
            .map_err(|_| Error::Request {
                step,
                reason: format!("API URL {:?} cannot take a path", self.config.api_base),
            })?
            .pop_if_empty()
            .extend(&[
                "contracts",
                self.config.contract.as_str(),
                "accounts",
                self.session.account_id.as_str(),
                "trips",
            ]);
        let request = HttpRequest::new(Method::GET, url)
            .header(
                HeaderName::from_static("identity"),
                sensitive_value(step, &self.session.id_token)?,
            )
            .header(header::AUTHORIZATION, self.takn_authorization(step)?)
            .header(
                header::ACCEPT,
                HeaderValue::from_static("application/json, text/plain, */*"),
            );
        let response = self.send(step, request)?;
        expect_status(step, StatusCode::OK, &response)?;
        let trips: Vec<Trip> = decode(step, &response.body)?;
        info!(
            "fetched {} trips for account {}",
            trips.len(),
            self.session.account_id
        );
        Ok(trips)
    }

    fn endpoint(&self, step: Step, path: &str) -> Result<Url> {
        self.config.endpoint(path).map_err(|e| Error::Request {
            step,
            reason: format!("bad API URL {:?}: {e}", self.config.api_base),
        })
    }

    fn takn_authorization(&self, step: Step) -> Result<HeaderValue> {
        sensitive_value(
            step,
            &format!("{TAKN_SCHEME} {}", self.session.access_token),
        )
    }

    fn send(&self, step: Step, request: HttpRequest) -> Result<HttpResponse> {
        // path only: the login query string carries the password
        debug!("{step}: {} {}", request.method, request.url.path());
        let response = self
            .transport
            .send(request)
            .map_err(|source| Error::Transport { step, source })?;
        debug!("{step}: response status {}", response.status);
        Ok(response)
    }
}

fn sensitive_value(step: Step, value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|e| Error::Request {
        step,
        reason: format!("header value: {e}"),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn expect_status(step: Step, expected: StatusCode, response: &HttpResponse) -> Result<()> {
    if response.status != expected {
        return Err(Error::UnexpectedStatus {
            step,
            expected,
            actual: response.status,
        });
    }
    Ok(())
}

fn to_json<S: serde::Serialize>(step: Step, body: &S) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| Error::Request {
        step,
        reason: format!("encoding JSON body: {e}"),
    })
}

fn decode<D: DeserializeOwned>(step: Step, body: &[u8]) -> Result<D> {
    serde_json::from_slice(body).map_err(|source| Error::Decode { step, source })
}

/// Pulls the `code` query parameter out of a redirect `Location`, resolving relative locations
/// against the URL that was requested.
fn code_from_location(request_url: &Url, location: &str) -> Result<String> {
    let location_url = request_url
        .join(location)
        .map_err(|source| Error::InvalidLocation {
            location: location.to_string(),
            source,
        })?;
    location_url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or(Error::MissingCode)
}

#[test]
fn test_code_from_location() {
    let base = Url::parse("https://api.cyclocity.fr/identities/users/login?takn=x").unwrap();
    assert_eq!(
        code_from_location(
            &base,
            "https://www.dublinbikes.ie/openid_connect_login?code=XYZ&state=1"
        )
        .unwrap(),
        "XYZ"
    );
    assert_eq!(
        code_from_location(&base, "https://www.dublinbikes.ie/cb?state=1&code=a%2Fb%3D%3D").unwrap(),
        "a/b=="
    );
    assert_eq!(
        code_from_location(&base, "/openid_connect_login?code=rel").unwrap(),
        "rel"
    );
    assert!(matches!(
        code_from_location(&base, "https://www.dublinbikes.ie/openid_connect_login?state=1"),
        Err(Error::MissingCode)
    ));
    assert!(matches!(
        code_from_location(&base, "https://www.dublinbikes.ie/openid_connect_login?code="),
        Err(Error::MissingCode)
    ));
    assert!(matches!(
        code_from_location(&base, "http://[::1"),
        Err(Error::InvalidLocation { .. })
    ));
}

#[test]
fn test_debug_redacts_secrets() {
    let credentials = Credentials {
        account_id: "acc-1".parse().unwrap(),
        email: "rider@example.com".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(!format!("{:?}", credentials).contains("hunter2"));

    let mut session = Session::new(credentials);
    session.access_token = "secret-access".to_string();
    session.id_token = "secret-id".to_string();
    let out = format!("{:?}", session);
    assert!(out.contains("rider@example.com"));
    assert!(!out.contains("hunter2"));
    assert!(!out.contains("secret-access"));
    assert!(!out.contains("secret-id"));
}

#[cfg(test)]
struct Canned(std::cell::RefCell<Vec<HttpResponse>>);

#[cfg(test)]
impl Transport for Canned {
    fn send(&self, _request: HttpRequest) -> std::result::Result<HttpResponse, crate::TransportError> {
        self.0.borrow_mut().pop().ok_or_else(|| "no canned response".into())
    }
}

#[test]
fn test_exchange_code_for_token() {
    let ok = |body: &str| HttpResponse {
        status: StatusCode::OK,
        headers: header::HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    };
    let mut client = TripClient {
        transport: Canned(std::cell::RefCell::new(vec![
            ok(r#"{"accessToken": "Z"}"#),
            ok(r#"{"access_token": "A", "refresh_token": "B", "id_token": "C",
                   "expires_in": 3600, "scope": "S", "token_type": "T"}"#),
        ])),
        config: Config::default(),
        session: Session::new(Credentials {
            account_id: "acc-1".parse().unwrap(),
            email: "rider@example.com".to_string(),
            password: "hunter2".to_string(),
        }),
    };
    client.session.access_token = "client-access".to_string();
    client.session.client_refresh_token = "client-refresh".to_string();

    client.exchange_code_for_token("XYZ").unwrap();
    assert_eq!(client.session().access_token(), "A");
    assert_eq!(client.session().id_token(), "C");
    assert_eq!(client.session().oauth_refresh_token(), "B");
    assert_eq!(client.session().client_refresh_token(), "client-refresh");

    client.refresh_access_token().unwrap();
    assert_eq!(client.session().access_token(), "Z");
    assert_eq!(client.session().id_token(), "C");

    assert!(matches!(
        client.refresh_access_token(),
        Err(Error::Transport {
            step: Step::Refresh,
            ..
        })
    ));
}

#[test]
fn test_connect_reports_client_build_failure() {
    let config = Config {
        user_agent: "bad\nagent".to_string(),
        ..Default::default()
    };
    let credentials = Credentials {
        account_id: "acc-1".parse().unwrap(),
        email: "rider@example.com".to_string(),
        password: "hunter2".to_string(),
    };
    match TripClient::connect(config, credentials) {
        Err(Error::Request { step, reason }) => {
            assert_eq!(step, Step::ClientToken);
            assert!(reason.starts_with("building HTTP client"));
        }
        other => panic!("expected request error, got {:?}", other),
    }
}
