//! Persisted client session state.
//!
//! The app keeps the signed-in user, their access token and the selected
//! neighbourhood across restarts. `AppSession` is that state as a plain
//! value; it crosses into the platform's key-value storage only through
//! `save` and `load`, each part under its own key.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const USER_KEY: &str = "session.user";
pub const TOKEN_KEY: &str = "session.access_token";
pub const NEIGHBORHOOD_KEY: &str = "session.neighborhood";

/// String key-value storage offered by the platform (device storage,
/// browser local storage).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub nickname: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Neighborhood {
    pub district: String,
    pub neighborhood: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct AppSession {
    pub user: Option<SessionUser>,
    pub access_token: Option<String>,
    pub neighborhood: Option<Neighborhood>,
}

impl AppSession {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    pub fn sign_in(&mut self, user: SessionUser, access_token: impl Into<String>) {
        self.user = Some(user);
        self.access_token = Some(access_token.into());
    }

    /// Drops credentials but keeps the chosen neighbourhood.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.access_token = None;
    }

    /// Restores a session. Missing keys leave the matching part empty;
    /// unreadable values are an error.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(Self {
            user: read(store, USER_KEY).await?,
            access_token: read(store, TOKEN_KEY).await?,
            neighborhood: read(store, NEIGHBORHOOD_KEY).await?,
        })
    }

    /// Persists every part; empty parts are removed from the store.
    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        write(store, USER_KEY, self.user.as_ref()).await?;
        write(store, TOKEN_KEY, self.access_token.as_ref()).await?;
        write(store, NEIGHBORHOOD_KEY, self.neighborhood.as_ref()).await
    }

    pub async fn clear(store: &dyn KeyValueStore) -> Result<()> {
        for key in [USER_KEY, TOKEN_KEY, NEIGHBORHOOD_KEY] {
            store.remove(key).await?;
        }
        Ok(())
    }
}

async fn read<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

async fn write<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: Option<&T>,
) -> Result<()> {
    match value {
        Some(value) => store.set(key, serde_json::to_string(value)?).await,
        None => store.remove(key).await,
    }
}
