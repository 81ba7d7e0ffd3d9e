//! Redmine tracker access
//!
//! - **API seam** (`api`) - `TrackerApi`, the operations commands rely on
//! - **REST client** (`client`) - `RedmineClient`, a reqwest implementation of that seam
//!
//! Every call is one request and one response. Failures come back as
//! `BotError::Transport` (network, non-success status) or
//! `BotError::MalformedResponse` (undecodable body).

pub mod api;
pub mod client;

pub use api::TrackerApi;
pub use client::RedmineClient;
