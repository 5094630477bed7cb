//! Circuit REST API client and authentication module.
//!
//! This module provides:
//! - OAuth2 client-credentials authentication
//! - A blocking client with one method per API endpoint
//! - Typed request options and response schemas

pub mod auth;
pub mod client;
mod middleware;
pub mod models;

pub use auth::TOKEN_PATH;
pub use client::CircuitClient;
pub use models::{
    AccessTokenResponse, Conversation, ConversationItem, ItemText, MessageOptions, UserPresence,
    UserProfile,
};
