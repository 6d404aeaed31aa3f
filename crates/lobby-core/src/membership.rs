//! Roster reconciliation and owner election.
//!
//! The platform is the source of truth for who is in the lobby. Every
//! reconciliation rebuilds the ordered member list from its snapshot and
//! hands out fresh dense indices, so an index is only meaningful until the
//! next `RosterChanged`.

use std::collections::HashSet;

use lobby_common::{AvatarHandle, LobbyError, Result, UserId};
use tracing::{debug, info};

use crate::platform::LobbyPlatform;

/// A lobby member as seen by the local peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub user_id: UserId,
    pub name: String,
    /// Position in the roster; the handle hosts use for queries.
    pub index: usize,
    pub avatar: Option<AvatarHandle>,
}

/// One row of the platform's roster snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub name: String,
    pub avatar: Option<AvatarHandle>,
}

impl RosterEntry {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            avatar: None,
        }
    }
}

/// Who joined and who left across one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDelta {
    pub joined: Vec<UserId>,
    pub left: Vec<UserId>,
}

impl RosterDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Ordered member list plus the lobby owner.
#[derive(Debug, Default)]
pub struct MembershipTracker {
    local_user: Option<UserId>,
    members: Vec<Member>,
    owner: Option<UserId>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the local identity. Ownership checks are false until this is set.
    pub fn bind_local_user(&mut self, user: UserId) {
        self.local_user = Some(user);
    }

    pub fn local_user(&self) -> Option<UserId> {
        self.local_user
    }

    /// Rebuild the member list from a platform snapshot.
    ///
    /// Platform order is preserved, duplicate identities keep their first
    /// position, and indices are reassigned `0..N`.
    pub fn reconcile(
        &mut self,
        roster: Vec<RosterEntry>,
        reported_owner: Option<UserId>,
    ) -> RosterDelta {
        let previous: HashSet<UserId> = self.members.iter().map(|m| m.user_id).collect();

        let mut seen = HashSet::with_capacity(roster.len());
        let mut members = Vec::with_capacity(roster.len());
        for entry in roster {
            if !seen.insert(entry.user_id) {
                debug!(user_id = %entry.user_id, "Duplicate roster entry ignored");
                continue;
            }
            members.push(Member {
                user_id: entry.user_id,
                name: entry.name,
                index: members.len(),
                avatar: entry.avatar,
            });
        }

        let delta = RosterDelta {
            joined: members
                .iter()
                .map(|m| m.user_id)
                .filter(|id| !previous.contains(id))
                .collect(),
            left: self
                .members
                .iter()
                .map(|m| m.user_id)
                .filter(|id| !seen.contains(id))
                .collect(),
        };

        self.members = members;
        self.set_owner(reported_owner);

        if !delta.is_empty() {
            info!(
                joined = delta.joined.len(),
                left = delta.left.len(),
                count = self.members.len(),
                "Roster reconciled"
            );
        }
        delta
    }

    /// Apply the platform's owner report.
    ///
    /// A reported owner that is not in the roster is stale (ownership
    /// migrates to the next member on the platform side); until the report
    /// catches up, the member at index 0 stands in.
    pub fn set_owner(&mut self, reported: Option<UserId>) {
        let in_roster = reported.is_some_and(|id| self.member_index_by_id(id).is_some());
        self.owner = if in_roster || self.members.is_empty() {
            reported
        } else {
            self.members.first().map(|m| m.user_id)
        };
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner
    }

    pub fn is_local_owner(&self) -> bool {
        matches!((self.owner, self.local_user), (Some(owner), Some(local)) if owner == local)
    }

    pub fn member_by_index(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }

    pub fn member_index_by_id(&self, user: UserId) -> Option<usize> {
        self.members.iter().position(|m| m.user_id == user)
    }

    pub fn member_by_id(&self, user: UserId) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user)
    }

    pub fn member_by_id_mut(&mut self, user: UserId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.user_id == user)
    }

    pub fn local_index(&self) -> Option<usize> {
        self.local_user.and_then(|id| self.member_index_by_id(id))
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Owner-only. The cached limit is left alone; it changes when the
    /// platform confirms.
    pub fn set_member_limit(&self, platform: &mut dyn LobbyPlatform, limit: u32) -> Result<()> {
        if !self.is_local_owner() {
            debug!(limit, "Ignoring member limit change from non-owner");
            return Err(LobbyError::NotOwner {
                operation: "set_lobby_member_limit",
            });
        }
        if !platform.set_member_limit(limit) {
            debug!(limit, "Platform did not accept member limit request");
        }
        Ok(())
    }
}
