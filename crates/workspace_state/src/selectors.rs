//! Pure projections of [`WorkspaceSession`] for the UI layer

use devhub_core::EditorSettings;

use crate::documents::Document;
use crate::presence::Collaborator;
use crate::session::WorkspaceSession;
use crate::terminals::Terminal;
use crate::workspace::{FileNode, WorkspaceInfo};

pub fn select_open_documents(session: &WorkspaceSession) -> &[Document] {
    session.documents().as_slice()
}

pub fn select_active_document(session: &WorkspaceSession) -> Option<&Document> {
    session.documents().active()
}

pub fn select_dirty_documents(session: &WorkspaceSession) -> Vec<&Document> {
    session.documents().dirty().collect()
}

pub fn select_terminals(session: &WorkspaceSession) -> &[Terminal] {
    session.terminals().as_slice()
}

pub fn select_active_terminal(session: &WorkspaceSession) -> Option<&Terminal> {
    session.terminals().active()
}

pub fn select_collaborators(session: &WorkspaceSession) -> Vec<&Collaborator> {
    session.collaborators().iter().collect()
}

pub fn select_editor_settings(session: &WorkspaceSession) -> &EditorSettings {
    session.editor_settings()
}

pub fn select_workspace(session: &WorkspaceSession) -> Option<&WorkspaceInfo> {
    session.workspace()
}

pub fn select_file_tree(session: &WorkspaceSession) -> Option<&FileNode> {
    session.file_tree()
}
