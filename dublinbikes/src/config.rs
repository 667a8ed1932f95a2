use std::time::Duration;
use url::Url;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub const DEFAULT_API_BASE: &str = "https://api.cyclocity.fr";
pub const DEFAULT_CONTRACT: &str = "dublin";
pub const DEFAULT_REDIRECT_URI: &str = "https://www.dublinbikes.ie/openid_connect_login";

/// Identifies the dublinbikes.ie web app to the identity service. These are the values the
/// public web site ships with, not per-user secrets.
pub const DEFAULT_CLIENT_CODE: &str = "vls.web.dublin:PRD";
pub const DEFAULT_CLIENT_KEY: &str =
    "0398667a307bbd0d8258a8c9b81dc11657aacae406a1b406a6b26b26ecc7f60e";

/// Scheme prefix the cyclocity API expects in `Authorization` headers.
pub const TAKN_SCHEME: &str = "Taknv1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Scheme and host of the API, without a trailing path
    pub api_base: String,
    /// Contract (city) whose account trips are listed
    pub contract: String,
    pub client_code: String,
    pub client_key: String,
    pub redirect_uri: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            contract: DEFAULT_CONTRACT.to_string(),
            client_code: DEFAULT_CLIENT_CODE.to_string(),
            client_key: DEFAULT_CLIENT_KEY.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: APP_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Full URL for an API path like `/auth/access_tokens`.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{}", self.api_base.trim_end_matches('/'), path))
    }
}

#[test]
fn test_endpoint() {
    let config = Config::default();
    assert_eq!(
        config.endpoint("/auth/access_tokens").unwrap().as_str(),
        "https://api.cyclocity.fr/auth/access_tokens"
    );

    let config = Config {
        api_base: "http://localhost:8080/".to_string(),
        ..Default::default()
    };
    assert_eq!(
        config
            .endpoint("/contracts/dublin/accounts/abc/trips")
            .unwrap()
            .as_str(),
        "http://localhost:8080/contracts/dublin/accounts/abc/trips"
    );

    let config = Config {
        api_base: "not a url".to_string(),
        ..Default::default()
    };
    assert!(config.endpoint("/auth/access_tokens").is_err());
}
