//! Collaborator presence roster
//!
//! Keyed by user id, iterated in first-seen order. Cursor and selection
//! updates are independent fields: updating one never touches the other.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WorkspaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

impl CursorPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRange>,
}

impl Collaborator {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            avatar: None,
            cursor: None,
            selection: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceTracker {
    by_user: HashMap<String, Collaborator>,
    order: Vec<String>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `user_id`'s cursor, creating the entry on first sight.
    ///
    /// `username` is only used when the entry is new; an unknown user with no
    /// name is listed under their id.
    pub fn upsert_cursor(&mut self, user_id: &str, username: Option<&str>, cursor: CursorPosition) {
        self.entry(user_id, username).cursor = Some(cursor);
    }

    pub fn upsert_selection(
        &mut self,
        user_id: &str,
        username: Option<&str>,
        selection: SelectionRange,
    ) {
        self.entry(user_id, username).selection = Some(selection);
    }

    /// Replace the whole roster. Duplicate ids collapse to the last entry,
    /// kept at the position where the id first appeared.
    pub fn replace_roster(&mut self, roster: Vec<Collaborator>) {
        self.by_user.clear();
        self.order.clear();
        for collaborator in roster {
            if !self.by_user.contains_key(&collaborator.user_id) {
                self.order.push(collaborator.user_id.clone());
            }
            self.by_user
                .insert(collaborator.user_id.clone(), collaborator);
        }
        debug!("Collaborator roster replaced ({} users)", self.order.len());
    }

    pub fn remove(&mut self, user_id: &str) -> Result<Collaborator> {
        let removed = self
            .by_user
            .remove(user_id)
            .ok_or_else(|| WorkspaceError::CollaboratorNotFound(user_id.to_string()))?;
        self.order.retain(|id| id != user_id);
        Ok(removed)
    }

    pub fn get(&self, user_id: &str) -> Option<&Collaborator> {
        self.by_user.get(user_id)
    }

    /// Collaborators in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Collaborator> {
        self.order.iter().filter_map(|id| self.by_user.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_user.clear();
        self.order.clear();
    }

    fn entry(&mut self, user_id: &str, username: Option<&str>) -> &mut Collaborator {
        if !self.by_user.contains_key(user_id) {
            debug!("New collaborator {user_id}");
            self.order.push(user_id.to_string());
        }
        self.by_user.entry(user_id.to_string()).or_insert_with(|| {
            Collaborator::new(user_id, username.unwrap_or(user_id))
        })
    }
}

impl Serialize for PresenceTracker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
