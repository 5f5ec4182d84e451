//! Workspace session
//!
//! Composes the document table, terminal registry and presence tracker with
//! editor settings and workspace chrome. Each transition takes `&mut self`
//! and either applies completely or returns an error with the state
//! untouched.

use devhub_core::{EditorSettings, EditorSettingsPatch};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands::{CommandOutcome, WorkspaceCommand};
use crate::documents::{Document, DocumentDescriptor, DocumentTable};
use crate::error::Result;
use crate::presence::{Collaborator, CursorPosition, PresenceTracker, SelectionRange};
use crate::terminals::{Terminal, TerminalRegistry};
use crate::workspace::{FileNode, WorkspaceInfo};

pub const DEFAULT_SIDEBAR_WIDTH: u32 = 280;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSession {
    documents: DocumentTable,
    terminals: TerminalRegistry,
    collaborators: PresenceTracker,
    editor_settings: EditorSettings,
    workspace: Option<WorkspaceInfo>,
    file_tree: Option<FileNode>,
    sidebar_collapsed: bool,
    sidebar_width: u32,
    is_loading: bool,
    error: Option<String>,
}

impl Default for WorkspaceSession {
    fn default() -> Self {
        Self::init(EditorSettings::default())
    }
}

impl WorkspaceSession {
    pub fn init(editor_settings: EditorSettings) -> Self {
        debug!("Workspace session initialised");
        Self {
            documents: DocumentTable::new(),
            terminals: TerminalRegistry::new(),
            collaborators: PresenceTracker::new(),
            editor_settings,
            workspace: None,
            file_tree: None,
            sidebar_collapsed: false,
            sidebar_width: DEFAULT_SIDEBAR_WIDTH,
            is_loading: false,
            error: None,
        }
    }

    /// End the session, handing back documents with unsaved edits.
    pub fn dispose(mut self) -> Vec<Document> {
        let dirty: Vec<Document> = self
            .documents
            .drain()
            .into_iter()
            .filter(|doc| doc.dirty)
            .collect();
        self.terminals.clear();
        self.collaborators.clear();

        if dirty.is_empty() {
            info!("Workspace session disposed");
        } else {
            warn!(
                "Workspace session disposed with {} unsaved document(s)",
                dirty.len()
            );
        }
        dirty
    }

    /// Apply one command
    pub fn dispatch(&mut self, command: WorkspaceCommand) -> Result<CommandOutcome> {
        let name = command.name();
        let outcome = match command {
            WorkspaceCommand::OpenDocument(descriptor) => {
                CommandOutcome::DocumentOpened(self.open_document(descriptor))
            }
            WorkspaceCommand::CloseDocument { id } => {
                CommandOutcome::DocumentClosed(self.close_document(&id)?)
            }
            WorkspaceCommand::SwitchDocument { id } => {
                self.switch_document(&id)?;
                CommandOutcome::Applied
            }
            WorkspaceCommand::EditDocument { id, content } => {
                self.edit_document(&id, content)?;
                CommandOutcome::Applied
            }
            WorkspaceCommand::SaveDocument { id } => {
                self.save_document(&id)?;
                CommandOutcome::Applied
            }
            WorkspaceCommand::OpenTerminal { id, title } => {
                self.open_terminal(Terminal::new(id, title));
                CommandOutcome::Applied
            }
            WorkspaceCommand::CloseTerminal { id } => {
                CommandOutcome::TerminalClosed(self.close_terminal(&id)?)
            }
            WorkspaceCommand::SwitchTerminal { id } => {
                self.switch_terminal(&id)?;
                CommandOutcome::Applied
            }
            WorkspaceCommand::UpsertCollaboratorCursor {
                user_id,
                username,
                cursor,
            } => {
                self.upsert_collaborator_cursor(&user_id, username.as_deref(), cursor);
                CommandOutcome::Applied
            }
            WorkspaceCommand::UpsertCollaboratorSelection {
                user_id,
                username,
                selection,
            } => {
                self.upsert_collaborator_selection(&user_id, username.as_deref(), selection);
                CommandOutcome::Applied
            }
            WorkspaceCommand::ReplaceCollaboratorRoster { collaborators } => {
                self.replace_collaborator_roster(collaborators);
                CommandOutcome::Applied
            }
            WorkspaceCommand::RemoveCollaborator { user_id } => {
                CommandOutcome::CollaboratorRemoved(self.remove_collaborator(&user_id)?)
            }
            WorkspaceCommand::UpdateEditorSettings(patch) => {
                self.update_editor_settings(&patch);
                CommandOutcome::Applied
            }
            WorkspaceCommand::SetWorkspace { workspace } => {
                self.workspace = workspace;
                CommandOutcome::Applied
            }
            WorkspaceCommand::SetFileTree { tree } => {
                self.file_tree = tree;
                CommandOutcome::Applied
            }
            WorkspaceCommand::ToggleSidebar => {
                self.sidebar_collapsed = !self.sidebar_collapsed;
                CommandOutcome::Applied
            }
            WorkspaceCommand::SetSidebarWidth { width } => {
                self.sidebar_width = width;
                CommandOutcome::Applied
            }
            WorkspaceCommand::SetLoading { loading } => {
                self.is_loading = loading;
                CommandOutcome::Applied
            }
            WorkspaceCommand::SetError { message } => {
                self.error = message;
                CommandOutcome::Applied
            }
            WorkspaceCommand::ClearError => {
                self.error = None;
                CommandOutcome::Applied
            }
        };
        debug!("Applied workspace command {name}");
        Ok(outcome)
    }

    // Documents

    pub fn open_document(&mut self, descriptor: DocumentDescriptor) -> String {
        self.documents.open(descriptor)
    }

    /// Open a file from the current file tree by path.
    ///
    /// Returns `None` when there is no tree, the path is unknown or it names a
    /// directory.
    pub fn open_from_tree(&mut self, path: &str) -> Option<String> {
        let descriptor = self.file_tree.as_ref()?.find(path)?.to_descriptor()?;
        Some(self.documents.open(descriptor))
    }

    pub fn close_document(&mut self, id: &str) -> Result<Document> {
        let closed = self.documents.close(id)?;
        if closed.dirty {
            warn!("Closed {} with unsaved changes", closed.path);
        }
        Ok(closed)
    }

    pub fn switch_document(&mut self, id: &str) -> Result<()> {
        self.documents.switch(id)
    }

    pub fn edit_document(&mut self, id: &str, content: String) -> Result<()> {
        self.documents.edit(id, content)
    }

    pub fn save_document(&mut self, id: &str) -> Result<()> {
        self.documents.save(id)
    }

    // Terminals

    pub fn open_terminal(&mut self, terminal: Terminal) {
        self.terminals.open(terminal);
    }

    pub fn close_terminal(&mut self, id: &str) -> Result<Terminal> {
        self.terminals.close(id)
    }

    pub fn switch_terminal(&mut self, id: &str) -> Result<()> {
        self.terminals.switch(id)
    }

    // Presence

    pub fn upsert_collaborator_cursor(
        &mut self,
        user_id: &str,
        username: Option<&str>,
        cursor: CursorPosition,
    ) {
        self.collaborators.upsert_cursor(user_id, username, cursor);
    }

    pub fn upsert_collaborator_selection(
        &mut self,
        user_id: &str,
        username: Option<&str>,
        selection: SelectionRange,
    ) {
        self.collaborators
            .upsert_selection(user_id, username, selection);
    }

    pub fn replace_collaborator_roster(&mut self, roster: Vec<Collaborator>) {
        self.collaborators.replace_roster(roster);
    }

    pub fn remove_collaborator(&mut self, user_id: &str) -> Result<Collaborator> {
        self.collaborators.remove(user_id)
    }

    // Settings and chrome

    pub fn update_editor_settings(&mut self, patch: &EditorSettingsPatch) {
        self.editor_settings.apply(patch);
    }

    pub fn documents(&self) -> &DocumentTable {
        &self.documents
    }

    pub fn terminals(&self) -> &TerminalRegistry {
        &self.terminals
    }

    pub fn collaborators(&self) -> &PresenceTracker {
        &self.collaborators
    }

    pub fn editor_settings(&self) -> &EditorSettings {
        &self.editor_settings
    }

    pub fn workspace(&self) -> Option<&WorkspaceInfo> {
        self.workspace.as_ref()
    }

    pub fn file_tree(&self) -> Option<&FileNode> {
        self.file_tree.as_ref()
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.sidebar_collapsed
    }

    pub fn sidebar_width(&self) -> u32 {
        self.sidebar_width
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkspaceError;
    use devhub_core::EditorTheme;

    #[test]
    fn test_defaults() {
        let session = WorkspaceSession::default();
        assert_eq!(session.sidebar_width(), 280);
        assert!(!session.sidebar_collapsed());
        assert_eq!(session.editor_settings(), &EditorSettings::default());
        assert!(session.documents().is_empty());
    }

    #[test]
    fn test_dispatch_failure_leaves_state_untouched() {
        let mut session = WorkspaceSession::default();
        session.open_document(DocumentDescriptor::new("/a.rs").with_id("a"));
        let before = session.clone();

        let err = session
            .dispatch(WorkspaceCommand::CloseDocument { id: "zz".into() })
            .unwrap_err();
        assert_eq!(err, WorkspaceError::DocumentNotFound("zz".into()));
        assert!(session
            .dispatch(WorkspaceCommand::SwitchTerminal { id: "t".into() })
            .is_err());
        assert!(session
            .dispatch(WorkspaceCommand::RemoveCollaborator { user_id: "u".into() })
            .is_err());
        assert_eq!(session, before);
    }

    #[test]
    fn test_editor_settings_patch_merges() {
        let mut session = WorkspaceSession::default();
        session
            .dispatch(WorkspaceCommand::UpdateEditorSettings(EditorSettingsPatch {
                theme: Some(EditorTheme::HcBlack),
                font_size: Some(16),
                ..Default::default()
            }))
            .unwrap();

        let settings = session.editor_settings();
        assert_eq!(settings.theme, EditorTheme::HcBlack);
        assert_eq!(settings.font_size, 16);
        assert_eq!(settings.tab_size, 2);
        assert!(settings.minimap);
    }

    #[test]
    fn test_chrome_commands() {
        let mut session = WorkspaceSession::default();
        session.dispatch(WorkspaceCommand::ToggleSidebar).unwrap();
        session
            .dispatch(WorkspaceCommand::SetSidebarWidth { width: 360 })
            .unwrap();
        session
            .dispatch(WorkspaceCommand::SetLoading { loading: true })
            .unwrap();
        session
            .dispatch(WorkspaceCommand::SetError {
                message: Some("Workspace unavailable".into()),
            })
            .unwrap();

        assert!(session.sidebar_collapsed());
        assert_eq!(session.sidebar_width(), 360);
        assert!(session.is_loading());
        assert_eq!(session.error(), Some("Workspace unavailable"));

        session.dispatch(WorkspaceCommand::ClearError).unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_dispose_returns_dirty_documents() {
        let mut session = WorkspaceSession::default();
        let a = session.open_document(DocumentDescriptor::new("/a.rs"));
        session.open_document(DocumentDescriptor::new("/b.rs"));
        session.edit_document(&a, "fn main() {}".into()).unwrap();

        let unsaved = session.dispose();
        assert_eq!(unsaved.len(), 1);
        assert_eq!(unsaved[0].path, "/a.rs");
        assert_eq!(unsaved[0].content, "fn main() {}");
    }
}
