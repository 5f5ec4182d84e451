//! Workspace descriptor and file tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::DocumentDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceStatus {
    Active,
    Inactive,
    Creating,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEnvironment {
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: WorkspaceStatus,
    pub environment: WorkspaceEnvironment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    /// Depth-first lookup by path
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(path))
    }

    /// Descriptor for opening this node; `None` for directories.
    ///
    /// Content is empty until the caller loads it.
    pub fn to_descriptor(&self) -> Option<DocumentDescriptor> {
        match self.kind {
            FileKind::Directory => None,
            FileKind::File => Some(DocumentDescriptor {
                id: Some(self.id.clone()),
                path: self.path.clone(),
                display_name: Some(self.name.clone()),
                ..Default::default()
            }),
        }
    }
}
