//! Editor settings
//!
//! Process-wide settings read by every open document's renderer. They are
//! only ever changed through an explicit patch.

use serde::{Deserialize, Serialize};

/// Editor colour theme
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EditorTheme {
    #[default]
    #[serde(rename = "vs-dark")]
    VsDark,
    #[serde(rename = "vs-light")]
    VsLight,
    #[serde(rename = "hc-black")]
    HcBlack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default)]
    pub theme: EditorTheme,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    #[serde(default = "default_tab_size")]
    pub tab_size: u32,

    #[serde(default = "default_true")]
    pub word_wrap: bool,

    #[serde(default = "default_true")]
    pub minimap: bool,

    #[serde(default = "default_true")]
    pub line_numbers: bool,

    #[serde(default = "default_true")]
    pub folding: bool,
}

fn default_font_size() -> u32 {
    14
}

fn default_tab_size() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            theme: EditorTheme::VsDark,
            font_size: default_font_size(),
            tab_size: default_tab_size(),
            word_wrap: true,
            minimap: true,
            line_numbers: true,
            folding: true,
        }
    }
}

/// Partial update of [`EditorSettings`]; `None` fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<EditorTheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_wrap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_numbers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folding: Option<bool>,
}

impl EditorSettings {
    /// Merge a patch into the settings
    pub fn apply(&mut self, patch: &EditorSettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(tab_size) = patch.tab_size {
            self.tab_size = tab_size;
        }
        if let Some(word_wrap) = patch.word_wrap {
            self.word_wrap = word_wrap;
        }
        if let Some(minimap) = patch.minimap {
            self.minimap = minimap;
        }
        if let Some(line_numbers) = patch.line_numbers {
            self.line_numbers = line_numbers;
        }
        if let Some(folding) = patch.folding {
            self.folding = folding;
        }
    }
}
