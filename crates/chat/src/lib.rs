//! Chat integration for the Redmine tracker
//!
//! This crate turns chat messages into tracker operations:
//! - **Commands** (`commands`) - `redmine`/`rm` patterns such as `rm show 42`
//! - **Service** (`service`) - one async routine per command over [`TrackerApi`]
//! - **Events** (`events`) - ordered handler dispatch plus the passive mention listener
//! - **Rendering** (`render`, `replies`) - plain-text issue cards, lists and search results
//! - **Runner** (`runner`) - transport pump with reconnection logic
//!
//! # Architecture
//!
//! ```text
//! Transport → BotRunner → EventDispatcher → CommandHandler → TrackerCommands → TrackerApi
//!                                        ↘ MentionListener ↗
//!                 ↑                                  ↓
//!             deliver ←──────── OutboundMessage ─────┘
//! ```
//!
//! # Key Types
//!
//! - `BotRunner` - event loop with reconnection logic
//! - `EventDispatcher` - tries handlers in order, first answer wins
//! - `CommandRouter` - matches addressed text against the command table
//! - `TrackerCommandService` - trait for command implementations
//!
//! [`TrackerApi`]: redbot_tracker::TrackerApi

pub mod commands;
pub mod events;
pub mod integration;
pub mod render;
pub mod replies;
pub mod runner;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use integration::{build_dispatcher, register};
