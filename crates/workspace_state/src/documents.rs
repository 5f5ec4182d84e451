//! Open documents keyed by path

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, WorkspaceError};
use crate::tabs::{Tab, TabList};

/// An open editor tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub path: String,
    pub display_name: String,
    pub content: String,
    pub language: String,
    pub dirty: bool,
    pub is_active: bool,
}

impl Tab for Document {
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

/// What a caller knows about a document it wants to open.
///
/// Missing id, display name and language are derived from the path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DocumentDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    fn into_document(self) -> Document {
        let display_name = self
            .display_name
            .unwrap_or_else(|| display_name_for_path(&self.path));
        let language = self
            .language
            .unwrap_or_else(|| language_for_file(&display_name).to_string());
        Document {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            path: self.path,
            display_name,
            content: self.content,
            language,
            dirty: false,
            is_active: false,
        }
    }
}

/// Last path segment, ignoring trailing separators
pub fn display_name_for_path(path: &str) -> String {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// Editor language id for a file name, `plaintext` when unknown.
///
/// A name without a dot is matched whole, so `Dockerfile` maps to `dockerfile`.
pub fn language_for_file(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or(file_name)
        .to_ascii_lowercase();

    match extension.as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "dockerfile" => "dockerfile",
        _ => "plaintext",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentTable {
    tabs: TabList<Document>,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, or activate it if its path is already open.
    ///
    /// A requested id already held by another path is replaced with a fresh
    /// one. Returns the id of the now-active document.
    pub fn open(&mut self, mut descriptor: DocumentDescriptor) -> String {
        if let Some(existing) = self.by_path(&descriptor.path).map(|doc| doc.id.clone()) {
            debug!("Document {} already open, activating", descriptor.path);
            self.tabs.activate(&existing);
            return existing;
        }

        if let Some(taken) = descriptor.id.as_deref().filter(|id| self.tabs.get(id).is_some()) {
            warn!(
                "Document id {taken} is already in use, assigning a new id to {}",
                descriptor.path
            );
            descriptor.id = None;
        }

        let document = descriptor.into_document();
        let id = document.id.clone();
        debug!("Opening document {} as {}", document.path, id);
        self.tabs.insert_active(document);
        id
    }

    pub fn close(&mut self, id: &str) -> Result<Document> {
        self.tabs
            .remove(id)
            .ok_or_else(|| WorkspaceError::DocumentNotFound(id.to_string()))
    }

    pub fn switch(&mut self, id: &str) -> Result<()> {
        if self.tabs.activate(id) {
            Ok(())
        } else {
            Err(WorkspaceError::DocumentNotFound(id.to_string()))
        }
    }

    pub fn edit(&mut self, id: &str, content: String) -> Result<()> {
        let document = self.get_mut(id)?;
        document.content = content;
        document.dirty = true;
        Ok(())
    }

    /// Clears the dirty flag; content is left as is.
    pub fn save(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.dirty = false;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.tabs.get(id)
    }

    pub fn by_path(&self, path: &str) -> Option<&Document> {
        self.tabs.iter().find(|doc| doc.path == path)
    }

    pub fn active(&self) -> Option<&Document> {
        self.tabs.active()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.tabs.iter()
    }

    pub fn as_slice(&self) -> &[Document] {
        self.tabs.as_slice()
    }

    pub fn dirty(&self) -> impl Iterator<Item = &Document> {
        self.tabs.iter().filter(|doc| doc.dirty)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<Document> {
        self.tabs.drain()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Document> {
        self.tabs
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::DocumentNotFound(id.to_string()))
    }
}
