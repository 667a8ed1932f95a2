use anyhow::anyhow;
pub use anyhow::Result;
use dublinbikes::{AccountId, Credentials};
use std::str::FromStr;

pub mod pretty;

/// Turns raw command-line/env values into login credentials. Missing or empty values are
/// rejected here, before any request goes out.
pub fn credentials_from_args(
    account_id: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<Credentials> {
    let account_id = account_id
        .filter(|v| !v.is_empty())
        .ok_or(anyhow!("an account id is required (--account-id or ACCOUNT_ID)"))?;
    let account_id = AccountId::from_str(&account_id)?;
    let email = email
        .filter(|v| !v.trim().is_empty())
        .ok_or(anyhow!("an account email is required (--account-email or ACCOUNT_EMAIL)"))?;
    let password = password.filter(|v| !v.is_empty()).ok_or(anyhow!(
        "an account password is required (--account-password or ACCOUNT_PASSWORD)"
    ))?;
    Ok(Credentials {
        account_id,
        email,
        password,
    })
}

/// Parses a `--timeout` value; zero would make every request time out immediately.
pub fn parse_timeout_secs(s: &str) -> Result<u64> {
    match u64::from_str(s)? {
        0 => Err(anyhow!("timeout must be at least 1 second")),
        secs => Ok(secs),
    }
}

#[test]
fn test_parse_timeout_secs() {
    assert_eq!(parse_timeout_secs("30").unwrap(), 30);
    assert_eq!(parse_timeout_secs("1").unwrap(), 1);
    assert!(parse_timeout_secs("0").is_err());
    assert!(parse_timeout_secs("-5").is_err());
    assert!(parse_timeout_secs("soon").is_err());
}

#[test]
fn test_credentials_from_args() {
    let some = |s: &str| Some(s.to_string());

    let creds = credentials_from_args(some("acc-1"), some("a@example.com"), some("pw")).unwrap();
    assert_eq!(creds.account_id.as_str(), "acc-1");
    assert_eq!(creds.email, "a@example.com");
    assert_eq!(creds.password, "pw");

    assert!(credentials_from_args(None, some("a@example.com"), some("pw")).is_err());
    assert!(credentials_from_args(some(""), some("a@example.com"), some("pw")).is_err());
    assert!(credentials_from_args(some("a/b"), some("a@example.com"), some("pw")).is_err());
    assert!(credentials_from_args(some("acc-1"), some("  "), some("pw")).is_err());
    assert!(credentials_from_args(some("acc-1"), some("a@example.com"), None).is_err());
    assert!(credentials_from_args(some("acc-1"), some("a@example.com"), some("")).is_err());
}
