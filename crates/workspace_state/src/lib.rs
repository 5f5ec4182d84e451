//! # Workspace State
//!
//! In-memory state of an IDE-like workspace: open documents, terminals,
//! collaborator presence, editor settings and sidebar chrome. All transitions
//! are synchronous and driven through [`WorkspaceSession`] or its
//! [`WorkspaceCommand`] dispatcher.

pub mod commands;
pub mod documents;
pub mod error;
pub mod presence;
pub mod selectors;
pub mod session;
pub mod tabs;
pub mod terminals;
pub mod workspace;

// Re-exports
pub use commands::{CommandOutcome, WorkspaceCommand};
pub use devhub_core::{EditorSettings, EditorSettingsPatch, EditorTheme};
pub use documents::{Document, DocumentDescriptor, DocumentTable};
pub use error::{Result, WorkspaceError};
pub use presence::{Collaborator, CursorPosition, PresenceTracker, SelectionRange};
pub use session::WorkspaceSession;
pub use terminals::{Terminal, TerminalRegistry};
pub use workspace::{FileKind, FileNode, WorkspaceEnvironment, WorkspaceInfo, WorkspaceStatus};
