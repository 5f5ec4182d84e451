//! Terminal registry

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WorkspaceError};
use crate::tabs::{Tab, TabList};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Terminal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_active: false,
        }
    }
}

impl Tab for Terminal {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TerminalRegistry {
    tabs: TabList<Terminal>,
}

impl TerminalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening an id that is already registered activates it; the title is kept.
    pub fn open(&mut self, terminal: Terminal) {
        if self.tabs.activate(&terminal.id) {
            debug!("Terminal {} already open, activating", terminal.id);
            return;
        }
        debug!("Opening terminal {} ({})", terminal.id, terminal.title);
        self.tabs.insert_active(terminal);
    }

    pub fn close(&mut self, id: &str) -> Result<Terminal> {
        self.tabs
            .remove(id)
            .ok_or_else(|| WorkspaceError::TerminalNotFound(id.to_string()))
    }

    pub fn switch(&mut self, id: &str) -> Result<()> {
        if self.tabs.activate(id) {
            Ok(())
        } else {
            Err(WorkspaceError::TerminalNotFound(id.to_string()))
        }
    }

    pub fn get(&self, id: &str) -> Option<&Terminal> {
        self.tabs.get(id)
    }

    pub fn active(&self) -> Option<&Terminal> {
        self.tabs.active()
    }

    pub fn as_slice(&self) -> &[Terminal] {
        self.tabs.as_slice()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.tabs.drain();
    }
}
