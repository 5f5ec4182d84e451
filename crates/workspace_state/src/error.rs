//! Workspace error types

use thiserror::Error;

/// A command referenced an id that is not in the workspace.
///
/// State is never modified when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Terminal not found: {0}")]
    TerminalNotFound(String),

    #[error("Collaborator not found: {0}")]
    CollaboratorNotFound(String),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
