use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which request of the authentication/trips sequence an error came from.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Step {
    ClientToken,
    Login,
    TokenExchange,
    Refresh,
    Trips,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ClientToken => "client token",
            Step::Login => "login",
            Step::TokenExchange => "token exchange",
            Step::Refresh => "access token refresh",
            Step::Trips => "trips",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{step}: could not build request: {reason}")]
    Request { step: Step, reason: String },

    #[error("{step}: error making request: {source}")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },

    #[error("{step}: expected {expected} response status, got {actual}")]
    UnexpectedStatus {
        step: Step,
        expected: StatusCode,
        actual: StatusCode,
    },

    #[error("login: no Location header found in redirect response")]
    MissingLocation,

    #[error("login: error parsing Location URL {location:?}: {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("login: no code found in Location URL")]
    MissingCode,

    #[error("{step}: error decoding response body: {source}")]
    Decode {
        step: Step,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// The step this error aborted.
    pub fn step(&self) -> Step {
        match self {
            Error::Request { step, .. }
            | Error::Transport { step, .. }
            | Error::UnexpectedStatus { step, .. }
            | Error::Decode { step, .. } => *step,
            Error::MissingLocation | Error::InvalidLocation { .. } | Error::MissingCode => {
                Step::Login
            }
        }
    }
}

#[test]
fn test_error_messages() {
    let err = Error::UnexpectedStatus {
        step: Step::ClientToken,
        expected: StatusCode::OK,
        actual: StatusCode::FORBIDDEN,
    };
    assert_eq!(
        err.to_string(),
        "client token: expected 200 OK response status, got 403 Forbidden"
    );
    assert_eq!(err.step(), Step::ClientToken);

    let err = Error::UnexpectedStatus {
        step: Step::Login,
        expected: StatusCode::FOUND,
        actual: StatusCode::OK,
    };
    assert!(err.to_string().contains("302 Found"));
    assert!(err.to_string().contains("200 OK"));

    assert_eq!(Error::MissingCode.step(), Step::Login);
    assert_eq!(
        Error::MissingLocation.to_string(),
        "login: no Location header found in redirect response"
    );
}
