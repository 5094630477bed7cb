//! Circuit REST API client.
//!
//! Every public method maps to exactly one endpoint (except
//! [`CircuitClient::leave_group_conversation`], which looks up the caller
//! first). Requests are blocking and carry the bearer token obtained by
//! [`CircuitClient::access_token`].
//!
//! The client caches one access token and one profile of the calling user
//! for its whole lifetime. Neither cache expires and neither is
//! synchronized; use one client per thread.

use std::cell::OnceCell;

use log::{debug, trace};
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::circuit::middleware::{check_response, decode_body, query_pairs};
use crate::circuit::models::{
    Conversation, ConversationItem, MessageOptions, UserPresence, UserProfile,
};
use crate::config::ClientConfig;
use crate::error::Result;

/// Circuit API client.
#[derive(Debug)]
pub struct CircuitClient {
    pub(super) config: ClientConfig,
    connection: OnceCell<Client>,
    pub(super) access_token: OnceCell<SecretString>,
    current_user: OnceCell<UserProfile>,
}

impl CircuitClient {
    /// Create a client. No connection is made until the first request.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
            access_token: OnceCell::new(),
            current_user: OnceCell::new(),
        }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The HTTP connection, built on first use with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connection(&self) -> Result<&Client> {
        if let Some(client) = self.connection.get() {
            return Ok(client);
        }

        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(self.connection.get_or_init(|| client))
    }

    /// List all conversations of the user.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.call(Method::GET, "/conversations", None)
    }

    /// Post a message to a conversation, or edit an existing one when
    /// `options.item_id` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn create_message(
        &self,
        conv: &str,
        text: &str,
        options: &MessageOptions,
    ) -> Result<ConversationItem> {
        let payload = options.payload(text);
        self.call(Method::POST, &options.path(conv), Some(&payload))
    }

    /// Create a group conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn create_group_conversation(
        &self,
        participants: &[String],
        topic: &str,
    ) -> Result<Conversation> {
        let payload = json!({
            "participants": participants,
            "topic": topic,
        });
        self.call(Method::POST, "/conversations/group", Some(&payload))
    }

    /// Create a 1:1 conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn create_direct_conversation(&self, participant: &str) -> Result<Conversation> {
        let payload = json!({ "participant": participant });
        self.call(Method::POST, "/conversations/direct", Some(&payload))
    }

    /// Remove participants from a group conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn delete_group_conversation_participants(
        &self,
        conv: &str,
        participants: &[String],
    ) -> Result<Conversation> {
        let path = format!(
            "/conversations/group/{}/participants",
            urlencoding::encode(conv)
        );
        let payload = json!({ "participants": participants });
        self.call(Method::DELETE, &path, Some(&payload))
    }

    /// Remove the calling user from a group conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile lookup or the removal fails.
    pub fn leave_group_conversation(&self, conv: &str) -> Result<Conversation> {
        let user_id = self.current_user()?.user_id.clone();
        self.delete_group_conversation_participants(conv, &[user_id])
    }

    /// Get the profile of the calling user.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn get_user_profile(&self) -> Result<UserProfile> {
        self.call(Method::GET, "/users/profile", None)
    }

    /// The calling user's profile, fetched once per client.
    ///
    /// # Errors
    ///
    /// Returns an error if the first lookup fails.
    pub fn current_user(&self) -> Result<&UserProfile> {
        if let Some(profile) = self.current_user.get() {
            return Ok(profile);
        }

        let profile = self.get_user_profile()?;
        debug!("caching profile of user {}", profile.user_id);
        Ok(self.current_user.get_or_init(|| profile))
    }

    /// Get the profile of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn get_users(&self, id: &str) -> Result<UserProfile> {
        self.call(Method::GET, &format!("/users/{}", urlencoding::encode(id)), None)
    }

    /// Get presence information of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the request fails.
    pub fn get_users_presence(&self, id: &str) -> Result<UserPresence> {
        self.call(
            Method::GET,
            &format!("/users/{}/presence", urlencoding::encode(id)),
            None,
        )
    }

    /// Send an authenticated API request and decode the JSON response.
    ///
    /// POST payloads are sent as JSON bodies; GET and DELETE payloads as
    /// query parameters.
    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<T> {
        let url = self.config.build_api_uri(path)?;
        let token = self.access_token()?;

        let mut request = self
            .connection()?
            .request(method.clone(), url.clone())
            .timeout(self.config.timeout)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"));

        if let Some(payload) = payload {
            request = if method == Method::POST {
                request.json(payload)
            } else {
                request.query(&query_pairs(payload))
            };
        }

        debug!("{method} {url}");
        if self.config.trace {
            trace!("{method} {url} payload: {}", payload.unwrap_or(&Value::Null));
        }

        let response = check_response(request.send()?)?;
        if self.config.trace {
            trace!("{method} {url} -> {}", response.status());
        }
        decode_body(response, &format!("{method} {path}"), self.config.trace)
    }
}
