//! Replay a script of workspace commands
//!
//! The script is a JSON array of tagged commands, e.g.
//! `[{"type": "open_document", "path": "/src/a.ts"}, {"type": "toggle_sidebar"}]`.
//! A command that references a missing id is reported and skipped; the
//! remaining commands still run.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use devhub_core::Config;
use workspace_state::selectors::{
    select_active_document, select_active_terminal, select_collaborators, select_open_documents,
};
use workspace_state::{CommandOutcome, WorkspaceCommand, WorkspaceSession};

pub fn run(config: &Config, script: &Path, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read {}", script.display()))?;
    let commands: Vec<WorkspaceCommand> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid command script", script.display()))?;

    let mut session = WorkspaceSession::init(config.editor.clone());
    let mut rejected = 0usize;

    for (index, command) in commands.into_iter().enumerate() {
        let name = command.name();
        match session.dispatch(command) {
            Ok(outcome) => {
                if !json {
                    println!("{:>4} {} {}", index + 1, name, describe(&outcome).dimmed());
                }
            }
            Err(err) => {
                rejected += 1;
                eprintln!("{:>4} {} {}", index + 1, name, err.to_string().red());
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_summary(&session, rejected);
    }

    let unsaved = session.dispose();
    for doc in &unsaved {
        eprintln!("{} {}", "unsaved:".yellow(), doc.path);
    }
    Ok(())
}

fn describe(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Applied => String::new(),
        CommandOutcome::DocumentOpened(id) => format!("-> {id}"),
        CommandOutcome::DocumentClosed(doc) => format!("closed {}", doc.path),
        CommandOutcome::TerminalClosed(terminal) => format!("closed {}", terminal.title),
        CommandOutcome::CollaboratorRemoved(c) => format!("removed {}", c.username),
    }
}

fn print_summary(session: &WorkspaceSession, rejected: usize) {
    println!();
    println!("{}", "Documents".bold());
    for doc in select_open_documents(session) {
        let marker = if doc.is_active { "*" } else { " " };
        let dirty = if doc.dirty { " (modified)" } else { "" };
        println!(" {marker} {} [{}]{dirty}", doc.path, doc.language);
    }
    if select_active_document(session).is_none() {
        println!("   (no active document)");
    }

    if let Some(terminal) = select_active_terminal(session) {
        println!("{} {}", "Active terminal:".bold(), terminal.title);
    }

    let collaborators = select_collaborators(session);
    if !collaborators.is_empty() {
        println!("{}", "Collaborators".bold());
        for c in collaborators {
            match c.cursor {
                Some(cursor) => println!("   {} @ {}:{}", c.username, cursor.line, cursor.column),
                None => println!("   {}", c.username),
            }
        }
    }

    if rejected > 0 {
        println!("{}", format!("{rejected} command(s) rejected").red());
    }
}
