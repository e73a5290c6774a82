//! # folio - fluent client for document-oriented REST APIs
//!
//! A Rust client for document-oriented REST APIs: chained builder calls
//! accumulate filter, sort, pagination and composition state, a terminal
//! verb compiles that state into a concrete HTTP request, and an
//! authenticated dispatcher executes it and normalizes the response.
//!
//! ## Features
//!
//! - Fluent query chains with field-level filter helpers
//! - Deterministic URL and filter compilation
//! - Bearer-token authentication with a single transparent
//!   refresh-and-replay on token expiry
//! - Server feature negotiation via required capability flags
//! - Injectable transport for testing or in-process backends
//!
//! ## Basic Usage
//!
//! ```no_run
//! use folio::{Client, Config, FindOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), folio::Error> {
//!     let config = Config::new("https://api.example.com")
//!         .with_port(443)
//!         .with_property("library")
//!         .with_credentials("my-client", "my-secret");
//!
//!     let client = Client::new(config)?;
//!
//!     let books = client
//!         .in_collection("books")
//!         .where_field_is_equal_to("author", "George Orwell")
//!         .where_field_is_greater_than("published", 1940)
//!         .use_fields(["title", "published"])
//!         .limit_to(10)
//!         .find(FindOptions::default())
//!         .await?;
//!
//!     println!("{}", books);
//!     Ok(())
//! }
//! ```
//!
//! ## Updating documents in place
//!
//! ```no_run
//! use folio::Client;
//! use serde_json::json;
//!
//! # async fn run(client: Client) -> Result<(), folio::Error> {
//! let updated = client
//!     .in_collection("books")
//!     .where_field_exists("title")
//!     .apply(|mut book| {
//!         let title = book["title"].as_str().unwrap_or_default().to_uppercase();
//!         book["title"] = json!(title);
//!         book
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod terminators;
pub mod token;
pub mod transport;

mod dispatch;
mod urls;

// Re-export main types for convenience
pub use builder::{Builder, Mode, SortOrder};
pub use client::{create_http_client, Client, Config, Credentials};
pub use dispatch::{REQUIRES_HEADER, SUPPORTS_HEADER};
pub use error::{Error, Result};
pub use query::QueryExpression;
pub use request::{Body, Request, RESERVED_PROPERTIES};
pub use response::{Metadata, ResultSet};
pub use terminators::FindOptions;
pub use token::{BearerToken, CredentialsTokenProvider, StaticTokenProvider, TokenProvider};
pub use transport::{HttpTransport, Transport, TransportResponse};

// Re-export serde_json for convenience
pub use serde_json::json;
