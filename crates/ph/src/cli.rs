//! CLI command definitions and handlers
//!
//! One handler per subcommand. Every handler opens the store, resolves the
//! project for the current working directory when it needs one, performs
//! its reads/writes, and prints.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::db::ProjectDatabase;
use crate::display::{short_commit, short_timestamp, truncate, Colors};
use crate::git::{find_project_root, GitRepo, RepoInfo};
use crate::models::{Project, Snapshot};

#[derive(Parser)]
#[command(name = "ph")]
#[command(about = "Personal project history - snapshots, run commands, tasks, and notes per repository")]
#[command(version)]
#[command(after_help = r#"WORKFLOW:
    Every tracked repository gets a timeline of snapshots tied to git
    commits, a catalog of "how to run this" commands, a task list, and
    free-form notes. Everything lives in one local database under
    ~/.project_history.

EXAMPLES:
    # Start tracking the current repository
    ph init --description "API gateway experiment" --stack "rust,axum"

    # Record the current state
    ph snapshot --summary "auth middleware passing tests" --status green

    # Remember how to run things
    ph add-run dev "cargo run -- --port 8080" --notes "needs REDIS_URL"

    # Track work
    ph add-task "wire up rate limiting" --priority 1
    ph done-task 3

    # Capture an assistant answer or a decision
    ph add-note --type decision --summary "switched CORS handling to tower-http"

    # Where was I?
    ph status
    ph projects
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start tracking the current repository
    Init {
        /// Project name (default: root directory name)
        #[arg(long)]
        name: Option<String>,

        /// Short project description
        #[arg(long)]
        description: String,

        /// Comma-separated tech stack, e.g. "rust,axum,sqlite"
        #[arg(long)]
        stack: Option<String>,
    },

    /// Show current status for this project
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a snapshot of the current state
    Snapshot {
        /// Short summary of the current state or what you just did
        #[arg(short, long)]
        summary: String,

        /// Status tag: e.g. green, broken, refactor, spike
        #[arg(short = 't', long, default_value = "unknown")]
        status: String,
    },

    /// Register a "how to run this project" command
    AddRun {
        /// Short name for this command, e.g. dev, tests, worker
        label: String,

        /// The shell command to run
        command: String,

        /// Notes about when/why to use this command
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Add a task for this project
    AddTask {
        /// Short description of the task
        title: String,

        /// 1=high, 2=medium, 3=low
        #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(i64).range(1..=3))]
        priority: i64,
    },

    /// Mark a task as done
    DoneTask {
        /// ID of the task to mark as done
        task_id: i64,
    },

    /// Attach a note to this project (and its latest snapshot, if any)
    AddNote {
        /// Type of note: chatgpt, manual, decision, bug
        #[arg(short = 'k', long = "type", default_value = "manual")]
        note_type: String,

        /// Short description of what this note is about
        #[arg(short, long)]
        summary: String,

        /// Path to a file containing the full note text
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// URL of the source conversation or document
        #[arg(short, long)]
        link: Option<String>,
    },

    /// List known projects with their last snapshot
    Projects {
        /// Max number of projects to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Resolve the project root for the current working directory
fn resolved_root() -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to resolve current directory")?;
    Ok(find_project_root(&cwd))
}

/// Look up the project tracked at `root`, or exit asking for `ph init`
fn require_project(db: &ProjectDatabase, root: &Path, colors: &Colors) -> Result<Project> {
    match db.project_by_root(&root.to_string_lossy())? {
        Some(proj) => Ok(proj),
        None => {
            eprintln!(
                "{}Project not initialized. Run `ph init` first.{}",
                colors.yellow, colors.reset
            );
            std::process::exit(1);
        }
    }
}

/// Split a comma-separated stack string into clean tags
fn parse_stack(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Insert a snapshot with whatever the working copy can tell us
fn record_snapshot(
    db: &ProjectDatabase,
    proj: &Project,
    repo: &dyn RepoInfo,
    summary: &str,
    status: &str,
) -> Result<Snapshot> {
    db.insert_snapshot(
        proj.id,
        repo.current_commit().as_deref(),
        repo.current_branch().as_deref(),
        summary,
        status,
    )
}

/// Initialize project history for the current repository
pub fn cmd_init(name: Option<String>, description: String, stack: Option<String>) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let root_str = root.to_string_lossy().to_string();

    if db.project_by_root(&root_str)?.is_some() {
        println!("{}Project already initialized.{}", colors.green, colors.reset);
        return Ok(());
    }

    let name = name.unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_str.clone())
    });
    let stack = parse_stack(stack.as_deref().unwrap_or(""));
    let remote_url = GitRepo::new(&root).remote_url();

    let proj = db.insert_project(&name, &root_str, remote_url.as_deref(), &description, &stack)?;

    println!(
        "{}Initialized project history for {} at {}{}",
        colors.green,
        proj.name,
        root.display(),
        colors.reset
    );
    Ok(())
}

/// Show current status for this project
pub fn cmd_status(as_json: bool) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;

    let last_snap = db.latest_snapshot(proj.id)?;
    let run_commands = db.run_commands(proj.id)?;
    let tasks = db.open_tasks(proj.id, 5)?;
    let last_note = db.latest_note(proj.id)?;

    if as_json {
        let output = json!({
            "project": {
                "id": proj.id,
                "name": proj.name,
                "root_path": proj.root_path,
                "description": proj.description,
                "stack": proj.stack,
                "status": proj.status,
            },
            "last_snapshot": last_snap.as_ref().map(|s| json!({
                "timestamp": s.timestamp,
                "status": s.status,
                "summary": s.summary,
                "git_commit": s.git_commit,
                "branch": s.branch,
            })),
            "run_commands": run_commands.iter().map(|c| json!({
                "label": c.label,
                "command": c.command,
                "last_verified_at": c.last_verified_at,
                "notes": c.notes,
            })).collect::<Vec<_>>(),
            "top_tasks": tasks.iter().map(|t| json!({
                "id": t.id,
                "title": t.title,
                "status": t.status,
                "priority": t.priority,
            })).collect::<Vec<_>>(),
            "last_note": last_note.as_ref().map(|n| json!({
                "note_type": n.note_type,
                "created_at": n.created_at,
                "content": truncate(&n.content, 120),
                "source_link": n.source_link,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}{}{}{}", colors.bold, colors.cyan, proj.name, colors.reset);
    println!("{}", proj.description);
    println!("{}{}{}", colors.dim, proj.root_path, colors.reset);
    println!("{}Stack: {}{}", colors.dim, proj.stack.join(", "), colors.reset);

    match &last_snap {
        Some(snap) => {
            println!();
            println!("{}Last snapshot:{}", colors.bold, colors.reset);
            println!(
                "  {} | {} | {}",
                short_timestamp(&snap.timestamp),
                snap.status,
                snap.summary
            );
            if let Some(commit) = &snap.git_commit {
                println!(
                    "  Commit: {} ({})",
                    commit,
                    snap.branch.as_deref().unwrap_or("-")
                );
            }
        }
        None => {
            println!();
            println!(
                "{}No snapshots yet.{} Use `ph snapshot --summary \"...\"`",
                colors.yellow, colors.reset
            );
        }
    }

    if !run_commands.is_empty() {
        println!();
        println!("{}How to run:{}", colors.bold, colors.reset);
        println!("  {:<12} {:<44} {:<16}", "LABEL", "COMMAND", "VERIFIED");
        println!("  {}", "-".repeat(74));
        for c in &run_commands {
            let verified = c
                .last_verified_at
                .as_deref()
                .map(short_timestamp)
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<12} {:<44} {:<16}",
                c.label,
                truncate(&c.command, 44),
                verified
            );
        }
    }

    if !tasks.is_empty() {
        println!();
        println!("{}Top tasks:{}", colors.bold, colors.reset);
        for t in &tasks {
            println!(
                "  {} (P{}) #{} {}",
                t.status.to_uppercase(),
                t.priority,
                t.id,
                t.title
            );
        }
    }

    if let Some(note) = &last_note {
        println!();
        println!("{}Last note:{}", colors.bold, colors.reset);
        println!(
            "  [{}] {} | {}",
            note.note_type,
            short_timestamp(&note.created_at),
            truncate(&note.content, 120)
        );
        if let Some(link) = &note.source_link {
            println!("  Link: {}", link);
        }
    }

    Ok(())
}

/// Record a snapshot of the current state
pub fn cmd_snapshot(summary: String, status: String) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;
    let repo = GitRepo::new(&root);

    let snap = record_snapshot(&db, &proj, &repo, &summary, &status)?;

    let tied = match &snap.git_commit {
        Some(commit) => format!(" at {}", short_commit(commit)),
        None => String::new(),
    };
    println!(
        "{}Snapshot recorded for {}{}{}",
        colors.green, proj.name, tied, colors.reset
    );
    Ok(())
}

/// Register or refresh a "how to run this" command
pub fn cmd_add_run(label: String, command: String, notes: Option<String>) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;

    // Only a non-empty value replaces stored notes
    let notes = notes.filter(|n| !n.trim().is_empty());

    match db.run_command_by_label(proj.id, &label)? {
        Some(existing) => {
            db.update_run_command(existing.id, &command, notes.as_deref())?;
            println!(
                "{}Updated run command '{}' for {}{}",
                colors.yellow, label, proj.name, colors.reset
            );
        }
        None => {
            db.insert_run_command(proj.id, &label, &command, notes.as_deref())?;
            println!(
                "{}Added run command '{}' for {}{}",
                colors.green, label, proj.name, colors.reset
            );
        }
    }
    Ok(())
}

/// Add a task for this project
pub fn cmd_add_task(title: String, priority: i64) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;

    let task = db.insert_task(proj.id, &title, priority)?;
    println!(
        "{}Added task #{} (P{}) for {}:{} {}",
        colors.green, task.id, task.priority, proj.name, colors.reset, task.title
    );
    Ok(())
}

/// Mark a task as done
pub fn cmd_done_task(task_id: i64) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;

    let task = match db.task_by_id(proj.id, task_id)? {
        Some(task) => task,
        None => {
            eprintln!(
                "{}No task with id {} for project {}{}",
                colors.red, task_id, proj.name, colors.reset
            );
            std::process::exit(1);
        }
    };

    db.complete_task(task.id)?;
    println!(
        "{}Marked task {} as DONE:{} {}",
        colors.green, task.id, colors.reset, task.title
    );
    Ok(())
}

/// Attach a note to this project, and to the latest snapshot if one exists
pub fn cmd_add_note(
    note_type: String,
    summary: String,
    file: Option<PathBuf>,
    link: Option<String>,
) -> Result<()> {
    let colors = Colors::auto();
    let db = ProjectDatabase::open(None)?;
    let root = resolved_root()?;
    let proj = require_project(&db, &root, &colors)?;

    let last_snap = db.latest_snapshot(proj.id)?;

    // Full file text when a readable file is given, else the summary itself
    let content = match &file {
        Some(path) if path.exists() => fs::read_to_string(path)
            .with_context(|| format!("Failed to read note file: {}", path.display()))?,
        _ => summary.clone(),
    };

    let link = link.filter(|l| !l.trim().is_empty());
    let note = db.insert_note(
        proj.id,
        last_snap.as_ref().map(|s| s.id),
        &note_type,
        &content,
        link.as_deref(),
    )?;

    let attached = match note.snapshot_id {
        Some(id) => format!("snapshot {}", id),
        None => "no snapshot".to_string(),
    };
    println!(
        "{}Added {} note for {}{} ({})",
        colors.green, note.note_type, proj.name, colors.reset, attached
    );
    Ok(())
}

/// List known projects with their last snapshot
pub fn cmd_projects(limit: usize, as_json: bool) -> Result<()> {
    let db = ProjectDatabase::open(None)?;
    let projects = db.projects(limit)?;

    let mut rows = Vec::new();
    for proj in projects {
        let last_snap = db.latest_snapshot(proj.id)?;
        rows.push((proj, last_snap));
    }

    if as_json {
        let output: Vec<_> = rows
            .iter()
            .map(|(p, snap)| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "root_path": p.root_path,
                    "status": p.status,
                    "last_snapshot": snap.as_ref().map(|s| json!({
                        "timestamp": s.timestamp,
                        "status": s.status,
                        "git_commit": s.git_commit,
                        "branch": s.branch,
                    })),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{:<4} {:<20} {:<36} {:<8} {:<26} {:<20}",
        "ID", "NAME", "PATH", "STATUS", "LAST SNAPSHOT", "LAST COMMIT"
    );
    println!("{}", "-".repeat(118));

    for (p, snap) in &rows {
        let (snap_text, commit_text) = match snap {
            Some(s) => (
                format!("{} | {}", short_timestamp(&s.timestamp), s.status),
                match &s.git_commit {
                    Some(commit) => format!(
                        "{} ({})",
                        short_commit(commit),
                        s.branch.as_deref().unwrap_or("-")
                    ),
                    None => "-".to_string(),
                },
            ),
            None => ("-".to_string(), "-".to_string()),
        };

        println!(
            "{:<4} {:<20} {:<36} {:<8} {:<26} {:<20}",
            p.id,
            truncate(&p.name, 20),
            truncate(&p.root_path, 36),
            p.status,
            snap_text,
            commit_text
        );
    }

    println!("\nTotal: {} projects", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProjectDatabase;
    use tempfile::TempDir;

    /// Canned repo facts, standing in for a real working copy
    struct StubRepo {
        commit: Option<&'static str>,
        branch: Option<&'static str>,
        remote: Option<&'static str>,
    }

    impl RepoInfo for StubRepo {
        fn current_commit(&self) -> Option<String> {
            self.commit.map(String::from)
        }

        fn current_branch(&self) -> Option<String> {
            self.branch.map(String::from)
        }

        fn remote_url(&self) -> Option<String> {
            self.remote.map(String::from)
        }
    }

    #[test]
    fn test_record_snapshot_with_full_repo_facts() {
        let dir = TempDir::new().unwrap();
        let db = ProjectDatabase::open(Some(&dir.path().join("test.db"))).unwrap();
        let proj = db.insert_project("demo", "/tmp/demo", None, "x", &[]).unwrap();

        let repo = StubRepo {
            commit: Some("0123456789abcdef"),
            branch: Some("main"),
            remote: None,
        };
        let snap = record_snapshot(&db, &proj, &repo, "all green", "green").unwrap();

        assert_eq!(snap.git_commit.as_deref(), Some("0123456789abcdef"));
        assert_eq!(snap.branch.as_deref(), Some("main"));
        assert_eq!(snap.status, "green");
    }

    #[test]
    fn test_record_snapshot_degrades_per_field() {
        let dir = TempDir::new().unwrap();
        let db = ProjectDatabase::open(Some(&dir.path().join("test.db"))).unwrap();
        let proj = db.insert_project("demo", "/tmp/demo", None, "x", &[]).unwrap();

        // Detached head: commit available, branch not
        let repo = StubRepo {
            commit: Some("0123456789abcdef"),
            branch: None,
            remote: None,
        };
        let snap = record_snapshot(&db, &proj, &repo, "rebasing", "refactor").unwrap();

        assert!(snap.git_commit.is_some());
        assert!(snap.branch.is_none());
    }

    #[test]
    fn test_parse_stack() {
        assert_eq!(parse_stack("rust, axum ,sqlite"), vec!["rust", "axum", "sqlite"]);
        assert_eq!(parse_stack(""), Vec::<String>::new());
        assert_eq!(parse_stack(" , ,"), Vec::<String>::new());
    }

    #[test]
    fn test_cli_parses_init() {
        let cli = Cli::try_parse_from([
            "ph", "init", "--description", "demo", "--stack", "rust,sqlite",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Init { name, description, stack }) => {
                assert!(name.is_none());
                assert_eq!(description, "demo");
                assert_eq!(stack.as_deref(), Some("rust,sqlite"));
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_requires_init_description() {
        assert!(Cli::try_parse_from(["ph", "init"]).is_err());
    }

    #[test]
    fn test_cli_parses_snapshot_defaults() {
        let cli = Cli::try_parse_from(["ph", "snapshot", "-s", "state of things"]).unwrap();
        match cli.command {
            Some(Commands::Snapshot { summary, status }) => {
                assert_eq!(summary, "state of things");
                assert_eq!(status, "unknown");
            }
            _ => panic!("Expected Snapshot command"),
        }
    }

    #[test]
    fn test_cli_parses_add_run() {
        let cli = Cli::try_parse_from([
            "ph", "add-run", "dev", "cargo run", "--notes", "local only",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::AddRun { label, command, notes }) => {
                assert_eq!(label, "dev");
                assert_eq!(command, "cargo run");
                assert_eq!(notes.as_deref(), Some("local only"));
            }
            _ => panic!("Expected AddRun command"),
        }
    }

    #[test]
    fn test_cli_task_priority_bounds() {
        let cli = Cli::try_parse_from(["ph", "add-task", "write docs", "--priority", "1"]).unwrap();
        match cli.command {
            Some(Commands::AddTask { priority, .. }) => assert_eq!(priority, 1),
            _ => panic!("Expected AddTask command"),
        }

        let cli = Cli::try_parse_from(["ph", "add-task", "write docs"]).unwrap();
        match cli.command {
            Some(Commands::AddTask { priority, .. }) => assert_eq!(priority, 2),
            _ => panic!("Expected AddTask command"),
        }

        assert!(Cli::try_parse_from(["ph", "add-task", "x", "--priority", "4"]).is_err());
        assert!(Cli::try_parse_from(["ph", "add-task", "x", "--priority", "0"]).is_err());
    }

    #[test]
    fn test_cli_parses_add_note_defaults() {
        let cli = Cli::try_parse_from(["ph", "add-note", "--summary", "fix bug"]).unwrap();
        match cli.command {
            Some(Commands::AddNote { note_type, summary, file, link }) => {
                assert_eq!(note_type, "manual");
                assert_eq!(summary, "fix bug");
                assert!(file.is_none());
                assert!(link.is_none());
            }
            _ => panic!("Expected AddNote command"),
        }
    }

    #[test]
    fn test_cli_parses_projects_defaults() {
        let cli = Cli::try_parse_from(["ph", "projects"]).unwrap();
        match cli.command {
            Some(Commands::Projects { limit, json }) => {
                assert_eq!(limit, 20);
                assert!(!json);
            }
            _ => panic!("Expected Projects command"),
        }
    }

    #[test]
    fn test_cli_parses_done_task_id() {
        let cli = Cli::try_parse_from(["ph", "done-task", "7"]).unwrap();
        match cli.command {
            Some(Commands::DoneTask { task_id }) => assert_eq!(task_id, 7),
            _ => panic!("Expected DoneTask command"),
        }
    }
}
