//! Blocking client for the Dublin Bikes (JCDecaux cyclocity) account API.
//!
//! ```no_run
//! use dublinbikes::{Config, Credentials, TripClient};
//!
//! # fn main() -> Result<(), dublinbikes::Error> {
//! let credentials = Credentials {
//!     account_id: "my-account-id".parse().expect("account id"),
//!     email: "rider@example.com".to_string(),
//!     password: "correct horse".to_string(),
//! };
//! let mut client = TripClient::connect(Config::default(), credentials)?;
//! for trip in client.fetch_trips()? {
//!     println!("{} -> {}", trip.start_station, trip.end_station);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod models;
pub mod transport;

pub use client::{Credentials, Session, TripClient};
pub use config::Config;
pub use error::{Error, Result, Step};
pub use identifiers::AccountId;
pub use models::Trip;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
