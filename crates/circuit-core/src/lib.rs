//! Core library for send-circuit - a thin client for the Circuit REST API.
//!
//! This crate provides:
//! - Typed client configuration and YAML config file loading
//! - OAuth2 client-credentials authentication with an in-memory token cache
//! - One method per REST endpoint (conversations, messages, users, presence)
//! - Mapping of HTTP failures into typed errors

pub mod circuit;
pub mod config;
pub mod error;
pub mod paths;

pub use circuit::{
    AccessTokenResponse, CircuitClient, Conversation, ConversationItem, ItemText,
    MessageOptions, UserPresence, UserProfile,
};
pub use config::{AppConfig, AuthMethod, ClientConfig, Protocol};
pub use error::{CircuitError, Result};
pub use paths::{DEFAULT_CONFIG_FILE, resolve_config_path};

/// Application name used for the binary and log output.
pub const APP_NAME: &str = "send-circuit";

/// Returns the environment variable prefix for this application.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
