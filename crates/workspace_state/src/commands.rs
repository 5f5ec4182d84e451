//! Workspace commands
//!
//! Every mutation of a [`crate::WorkspaceSession`] can be expressed as a
//! [`WorkspaceCommand`], so a collaboration transport or a replay script can
//! drive the workspace with plain JSON:
//!
//! ```json
//! {"type": "edit_document", "id": "1", "content": "let x = 1;"}
//! ```

use devhub_core::EditorSettingsPatch;
use serde::{Deserialize, Serialize};

use crate::documents::{Document, DocumentDescriptor};
use crate::presence::{Collaborator, CursorPosition, SelectionRange};
use crate::terminals::Terminal;
use crate::workspace::{FileNode, WorkspaceInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WorkspaceCommand {
    // Documents
    OpenDocument(DocumentDescriptor),
    CloseDocument {
        id: String,
    },
    SwitchDocument {
        id: String,
    },
    EditDocument {
        id: String,
        content: String,
    },
    SaveDocument {
        id: String,
    },

    // Terminals
    OpenTerminal {
        id: String,
        title: String,
    },
    CloseTerminal {
        id: String,
    },
    SwitchTerminal {
        id: String,
    },

    // Presence
    UpsertCollaboratorCursor {
        user_id: String,
        #[serde(default)]
        username: Option<String>,
        cursor: CursorPosition,
    },
    UpsertCollaboratorSelection {
        user_id: String,
        #[serde(default)]
        username: Option<String>,
        selection: SelectionRange,
    },
    ReplaceCollaboratorRoster {
        collaborators: Vec<Collaborator>,
    },
    RemoveCollaborator {
        user_id: String,
    },

    // Settings and chrome
    UpdateEditorSettings(EditorSettingsPatch),
    SetWorkspace {
        workspace: Option<WorkspaceInfo>,
    },
    SetFileTree {
        tree: Option<FileNode>,
    },
    ToggleSidebar,
    SetSidebarWidth {
        width: u32,
    },
    SetLoading {
        loading: bool,
    },
    SetError {
        message: Option<String>,
    },
    ClearError,
}

impl WorkspaceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenDocument(_) => "open_document",
            Self::CloseDocument { .. } => "close_document",
            Self::SwitchDocument { .. } => "switch_document",
            Self::EditDocument { .. } => "edit_document",
            Self::SaveDocument { .. } => "save_document",
            Self::OpenTerminal { .. } => "open_terminal",
            Self::CloseTerminal { .. } => "close_terminal",
            Self::SwitchTerminal { .. } => "switch_terminal",
            Self::UpsertCollaboratorCursor { .. } => "upsert_collaborator_cursor",
            Self::UpsertCollaboratorSelection { .. } => "upsert_collaborator_selection",
            Self::ReplaceCollaboratorRoster { .. } => "replace_collaborator_roster",
            Self::RemoveCollaborator { .. } => "remove_collaborator",
            Self::UpdateEditorSettings(_) => "update_editor_settings",
            Self::SetWorkspace { .. } => "set_workspace",
            Self::SetFileTree { .. } => "set_file_tree",
            Self::ToggleSidebar => "toggle_sidebar",
            Self::SetSidebarWidth { .. } => "set_sidebar_width",
            Self::SetLoading { .. } => "set_loading",
            Self::SetError { .. } => "set_error",
            Self::ClearError => "clear_error",
        }
    }
}

/// What a successfully applied command produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied,
    DocumentOpened(String),
    DocumentClosed(Document),
    TerminalClosed(Terminal),
    CollaboratorRemoved(Collaborator),
}
