use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("not a valid account id: {0:?}")]
pub struct InvalidAccountId(String);

/// Account identifier, as shown on the dublinbikes.ie account page.
///
/// It ends up as a path segment of the trips URL, so only letters, digits and `._:@+-` are
/// accepted, starting with a letter or digit (which also rules out `.` and `..`).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct AccountId(String);

impl FromStr for AccountId {
    type Err = InvalidAccountId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref ACCOUNT_ID_RE: Regex =
                Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:@+\-]{0,255}$").unwrap();
        }
        if ACCOUNT_ID_RE.is_match(s) {
            Ok(AccountId(s.to_string()))
        } else {
            Err(InvalidAccountId(s.to_string()))
        }
    }
}

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[test]
fn test_account_id() {
    assert_eq!(
        AccountId::from_str("5f0c1e2d-aaaa-4bbb-8ccc-123456789abc")
            .unwrap()
            .as_str(),
        "5f0c1e2d-aaaa-4bbb-8ccc-123456789abc"
    );
    assert_eq!(AccountId::from_str("12345").unwrap().to_string(), "12345");

    assert!(AccountId::from_str("").is_err());
    assert!(AccountId::from_str("abc/def").is_err());
    assert!(AccountId::from_str("../trips").is_err());
    assert!(AccountId::from_str("abc?x=1").is_err());
    assert!(AccountId::from_str("abc#frag").is_err());
    assert!(AccountId::from_str("abc%2F").is_err());
    assert!(AccountId::from_str("abc def").is_err());
    assert!(AccountId::from_str(".").is_err());
    assert!(AccountId::from_str("..").is_err());
    assert!(AccountId::from_str(".hidden").is_err());
    assert!(AccountId::from_str("a\\b").is_err());
    assert!(AccountId::from_str("a\\..\\..\\x").is_err());
    assert!(AccountId::from_str("a.b_c:1@x+y").is_ok());
    assert_eq!(
        AccountId::from_str("a/b").unwrap_err().to_string(),
        "not a valid account id: \"a/b\""
    );
}
