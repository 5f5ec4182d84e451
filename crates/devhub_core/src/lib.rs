//! devhub_core - configuration shared by the session and workspace crates

pub mod config;
pub mod editor;
pub mod paths;

pub use config::Config;
pub use editor::{EditorSettings, EditorSettingsPatch, EditorTheme};
