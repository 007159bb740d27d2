//! ph - Personal project history
//!
//! "Which repo was I in, what state was it in, and how do I run it again?"
//!
//! Tracks a timeline of snapshots (tied to git commits), "how to run this"
//! commands, tasks, and notes per repository, all in one local SQLite
//! database under ~/.project_history.
//!
//! Commands:
//! - init: Start tracking the current repository
//! - status: Latest snapshot, run commands, top tasks, last note
//! - snapshot: Record the current state (ties to the current commit)
//! - add-run: Register a "how to run this" command
//! - add-task: Add a task
//! - done-task: Mark a task as done
//! - add-note: Attach a note (optionally to the latest snapshot)
//! - projects: List all tracked projects

mod cli;
mod db;
mod display;
mod git;
mod models;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { name, description, stack }) => {
            cli::cmd_init(name, description, stack)
        }
        Some(Commands::Status { json }) => cli::cmd_status(json),
        Some(Commands::Snapshot { summary, status }) => cli::cmd_snapshot(summary, status),
        Some(Commands::AddRun { label, command, notes }) => {
            cli::cmd_add_run(label, command, notes)
        }
        Some(Commands::AddTask { title, priority }) => cli::cmd_add_task(title, priority),
        Some(Commands::DoneTask { task_id }) => cli::cmd_done_task(task_id),
        Some(Commands::AddNote { note_type, summary, file, link }) => {
            cli::cmd_add_note(note_type, summary, file, link)
        }
        Some(Commands::Projects { limit, json }) => cli::cmd_projects(limit, json),
        None => {
            println!("ph - personal project history");
            println!();
            println!("Use 'ph --help' for usage information");
            println!("Use 'ph status' inside a tracked repository to see where you left off");
            Ok(())
        }
    }
}
