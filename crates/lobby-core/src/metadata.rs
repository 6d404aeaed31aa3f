//! Lobby-level and per-member key/value caches.
//!
//! Writes go to the platform and are never applied locally; the caches only
//! change when the platform's copy is pulled, either by a refresh or by the
//! `LobbyDataChanged` callback that confirms a write.

use std::collections::{BTreeMap, HashMap};

use lobby_common::{LobbyError, LobbyId, Result, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::platform::LobbyPlatform;

/// One lobby-level key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

/// Cached description of the lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyInfo {
    pub id: LobbyId,
    pub name: String,
    pub is_friend: bool,
    pub metadata: Vec<MetadataEntry>,
    /// A full refresh has been requested and not yet answered.
    pub data_requested: bool,
}

impl LobbyInfo {
    pub fn new(id: LobbyId) -> Self {
        Self {
            id,
            name: String::new(),
            is_friend: false,
            metadata: Vec::new(),
            data_requested: false,
        }
    }

    /// Value for `key`, empty when absent.
    pub fn value(&self, key: &str) -> &str {
        self.metadata
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
            .unwrap_or("")
    }
}

/// Seconds an unanswered lobby data request blocks a new one.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: f32 = 5.0;

#[derive(Debug)]
pub struct MetadataStore {
    info: LobbyInfo,
    member_data: HashMap<UserId, BTreeMap<String, String>>,
    request_timeout: f32,
    request_age: f32,
}

impl MetadataStore {
    pub fn new(lobby_id: LobbyId) -> Self {
        Self {
            info: LobbyInfo::new(lobby_id),
            member_data: HashMap::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            request_age: 0.0,
        }
    }

    /// After `secs` without an answer, the next non-passive refresh asks again.
    pub fn with_request_timeout(mut self, secs: f32) -> Self {
        self.request_timeout = secs;
        self
    }

    /// Age the outstanding request, if any.
    pub fn age_request(&mut self, dt: f32) {
        if self.info.data_requested && dt > 0.0 {
            self.request_age += dt;
        }
    }

    pub fn info(&self) -> &LobbyInfo {
        &self.info
    }

    /// Lobby-level value for `key`; absence and empty are indistinguishable.
    pub fn get(&self, key: &str) -> &str {
        self.info.value(key)
    }

    /// Request a replicated lobby-level write. Owner-only.
    pub fn set(
        &self,
        platform: &mut dyn LobbyPlatform,
        is_owner: bool,
        key: &str,
        value: &str,
    ) -> Result<()> {
        if !is_owner {
            debug!(key, "Ignoring lobby data write from non-owner");
            return Err(LobbyError::NotOwner {
                operation: "set_lobby_data",
            });
        }
        if !platform.set_lobby_data(key, value) {
            debug!(key, "Platform did not accept lobby data write");
        }
        Ok(())
    }

    /// Cached value of `key` in `user`'s member namespace, empty when absent.
    pub fn member_data(&self, user: UserId, key: &str) -> &str {
        self.member_data
            .get(&user)
            .and_then(|data| data.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Request a write into the local user's own member namespace.
    pub fn set_member_data(&self, platform: &mut dyn LobbyPlatform, key: &str, value: &str) {
        if !platform.set_member_data(key, value) {
            debug!(key, "Platform did not accept member data write");
        }
    }

    /// Re-pull lobby metadata from the platform's local copy.
    ///
    /// A non-passive refresh also asks the platform for fresh data, at most
    /// once per outstanding request. A request left unanswered past the
    /// timeout counts as lost and is issued again.
    pub fn refresh(&mut self, platform: &mut dyn LobbyPlatform, passive: bool) {
        self.pull_lobby(platform);
        if passive {
            return;
        }
        if self.info.data_requested {
            if self.request_age < self.request_timeout {
                return;
            }
            debug!(
                lobby_id = %self.info.id,
                age = self.request_age,
                "Lobby data request unanswered; asking again"
            );
        }
        if platform.request_lobby_data() {
            self.info.data_requested = true;
            self.request_age = 0.0;
            debug!(lobby_id = %self.info.id, "Requested lobby data");
        } else {
            debug!(lobby_id = %self.info.id, "Platform did not accept lobby data request");
        }
    }

    /// Lobby-level data changed on the platform; this completes any
    /// outstanding refresh.
    pub fn apply_lobby_update(&mut self, platform: &dyn LobbyPlatform) {
        self.pull_lobby(platform);
        self.info.data_requested = false;
        self.request_age = 0.0;
    }

    /// One member's data changed on the platform.
    pub fn apply_member_update(&mut self, platform: &dyn LobbyPlatform, user: UserId) {
        let data = platform.member_data_entries(user).into_iter().collect();
        self.member_data.insert(user, data);
    }

    /// Pull member data for the whole roster and forget departed members.
    pub fn refresh_members(&mut self, platform: &dyn LobbyPlatform, roster: &[UserId]) {
        self.member_data.retain(|id, _| roster.contains(id));
        for &user in roster {
            self.apply_member_update(platform, user);
        }
    }

    fn pull_lobby(&mut self, platform: &dyn LobbyPlatform) {
        self.info.name = platform.lobby_name();
        self.info.is_friend = platform.is_friend_lobby();
        self.info.metadata = platform
            .lobby_data_entries()
            .into_iter()
            .map(|(key, value)| MetadataEntry { key, value })
            .collect();
        trace!(entries = self.info.metadata.len(), "Pulled lobby metadata");
    }
}
