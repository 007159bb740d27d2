//! SQLite storage for the project history store
//!
//! One database file per user holds every tracked project. Schema creation
//! is additive and idempotent, so it is safe to run before every command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Note, Project, RunCommand, Snapshot, Task};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    root_path TEXT NOT NULL UNIQUE,
    remote_url TEXT,
    description TEXT NOT NULL,
    stack TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'active'
);

CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    git_commit TEXT,
    branch TEXT,
    timestamp TEXT NOT NULL,
    summary TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'unknown'
);

CREATE TABLE IF NOT EXISTS run_commands (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    label TEXT NOT NULL,
    command TEXT NOT NULL,
    last_verified_at TEXT,
    notes TEXT,
    UNIQUE(project_id, label)
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'todo',
    priority INTEGER NOT NULL DEFAULT 2,
    blocked_by INTEGER REFERENCES tasks(id),
    created_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    snapshot_id INTEGER REFERENCES snapshots(id),
    note_type TEXT NOT NULL DEFAULT 'manual',
    content TEXT NOT NULL,
    source_link TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_project ON snapshots(project_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, status);
CREATE INDEX IF NOT EXISTS idx_notes_project ON notes(project_id, created_at DESC);
"#;

/// Get path to the database file (~/.project_history/ph.db)
pub fn get_db_path() -> PathBuf {
    let base = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".project_history");

    if let Err(e) = fs::create_dir_all(&base) {
        eprintln!("Warning: failed to create data directory: {}", e);
    }

    base.join("ph.db")
}

/// Database handle for the project history store
pub struct ProjectDatabase {
    conn: Connection,
}

impl ProjectDatabase {
    /// Open or create the database
    pub fn open(db_path: Option<&Path>) -> Result<Self> {
        let path = db_path.map(|p| p.to_path_buf()).unwrap_or_else(get_db_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;

        Ok(Self { conn })
    }

    // ---- projects ----

    /// Insert a new project, returning the stored record
    pub fn insert_project(
        &self,
        name: &str,
        root_path: &str,
        remote_url: Option<&str>,
        description: &str,
        stack: &[String],
    ) -> Result<Project> {
        let stack_json = serde_json::to_string(stack)?;
        self.conn.execute(
            "INSERT INTO projects (name, root_path, remote_url, description, stack)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, root_path, remote_url, description, stack_json],
        )?;

        Ok(Project {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            root_path: root_path.to_string(),
            remote_url: remote_url.map(String::from),
            description: description.to_string(),
            stack: stack.to_vec(),
            status: "active".to_string(),
        })
    }

    /// Look up a project by its exact root path string
    pub fn project_by_root(&self, root_path: &str) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, root_path, remote_url, description, stack, status
                 FROM projects WHERE root_path = ?1",
                params![root_path],
                project_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List projects in storage order
    pub fn projects(&self, limit: usize) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, root_path, remote_url, description, stack, status
             FROM projects ORDER BY id ASC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], project_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ---- snapshots ----

    /// Insert a snapshot stamped with the current time
    pub fn insert_snapshot(
        &self,
        project_id: i64,
        git_commit: Option<&str>,
        branch: Option<&str>,
        summary: &str,
        status: &str,
    ) -> Result<Snapshot> {
        let timestamp = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO snapshots (project_id, git_commit, branch, timestamp, summary, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![project_id, git_commit, branch, timestamp, summary, status],
        )?;

        Ok(Snapshot {
            id: self.conn.last_insert_rowid(),
            project_id,
            git_commit: git_commit.map(String::from),
            branch: branch.map(String::from),
            timestamp,
            summary: summary.to_string(),
            status: status.to_string(),
        })
    }

    /// Most recent snapshot for a project
    pub fn latest_snapshot(&self, project_id: i64) -> Result<Option<Snapshot>> {
        self.conn
            .query_row(
                "SELECT id, project_id, git_commit, branch, timestamp, summary, status
                 FROM snapshots WHERE project_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                params![project_id],
                snapshot_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    // ---- run commands ----

    /// Look up a run command by its label within a project
    pub fn run_command_by_label(&self, project_id: i64, label: &str) -> Result<Option<RunCommand>> {
        self.conn
            .query_row(
                "SELECT id, project_id, label, command, last_verified_at, notes
                 FROM run_commands WHERE project_id = ?1 AND label = ?2",
                params![project_id, label],
                run_command_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a new run command, marking it verified now
    pub fn insert_run_command(
        &self,
        project_id: i64,
        label: &str,
        command: &str,
        notes: Option<&str>,
    ) -> Result<RunCommand> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run_commands (project_id, label, command, last_verified_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![project_id, label, command, now, notes],
        )?;

        Ok(RunCommand {
            id: self.conn.last_insert_rowid(),
            project_id,
            label: label.to_string(),
            command: command.to_string(),
            last_verified_at: Some(now),
            notes: notes.map(String::from),
        })
    }

    /// Update an existing run command in place and refresh its verification
    /// time. `notes` replaces the stored value only when given; None keeps
    /// whatever is there.
    pub fn update_run_command(&self, id: i64, command: &str, notes: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE run_commands
             SET command = ?2, notes = COALESCE(?3, notes), last_verified_at = ?4
             WHERE id = ?1",
            params![id, command, notes, now],
        )?;
        Ok(())
    }

    /// All run commands for a project
    pub fn run_commands(&self, project_id: i64) -> Result<Vec<RunCommand>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, label, command, last_verified_at, notes
             FROM run_commands WHERE project_id = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![project_id], run_command_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ---- tasks ----

    /// Insert a new task with status "todo"
    pub fn insert_task(&self, project_id: i64, title: &str, priority: i64) -> Result<Task> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO tasks (project_id, title, priority, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, title, priority, created_at],
        )?;

        Ok(Task {
            id: self.conn.last_insert_rowid(),
            project_id,
            title: title.to_string(),
            status: "todo".to_string(),
            priority,
            blocked_by: None,
            created_at,
            completed_at: None,
        })
    }

    /// Look up a task by id, scoped to a project
    pub fn task_by_id(&self, project_id: i64, task_id: i64) -> Result<Option<Task>> {
        self.conn
            .query_row(
                "SELECT id, project_id, title, status, priority, blocked_by, created_at, completed_at
                 FROM tasks WHERE project_id = ?1 AND id = ?2",
                params![project_id, task_id],
                task_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Mark a task done and stamp its completion time
    pub fn complete_task(&self, task_id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE tasks SET status = 'done', completed_at = ?2 WHERE id = ?1",
            params![task_id, now],
        )?;
        Ok(())
    }

    /// Non-done tasks for a project, highest priority first
    pub fn open_tasks(&self, project_id: i64, limit: usize) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, priority, blocked_by, created_at, completed_at
             FROM tasks WHERE project_id = ?1 AND status != 'done'
             ORDER BY priority ASC, id ASC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![project_id, limit as i64], task_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ---- notes ----

    /// Insert a note, optionally attached to a snapshot
    pub fn insert_note(
        &self,
        project_id: i64,
        snapshot_id: Option<i64>,
        note_type: &str,
        content: &str,
        source_link: Option<&str>,
    ) -> Result<Note> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO notes (project_id, snapshot_id, note_type, content, source_link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![project_id, snapshot_id, note_type, content, source_link, created_at],
        )?;

        Ok(Note {
            id: self.conn.last_insert_rowid(),
            project_id,
            snapshot_id,
            note_type: note_type.to_string(),
            content: content.to_string(),
            source_link: source_link.map(String::from),
            created_at,
        })
    }

    /// Most recent note for a project
    pub fn latest_note(&self, project_id: i64) -> Result<Option<Note>> {
        self.conn
            .query_row(
                "SELECT id, project_id, snapshot_id, note_type, content, source_link, created_at
                 FROM notes WHERE project_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![project_id],
                note_from_row,
            )
            .optional()
            .map_err(Into::into)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let stack_json: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        root_path: row.get(2)?,
        remote_url: row.get(3)?,
        description: row.get(4)?,
        // Unparseable stack degrades to no tags rather than failing the row
        stack: serde_json::from_str(&stack_json).unwrap_or_default(),
        status: row.get(6)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        project_id: row.get(1)?,
        git_commit: row.get(2)?,
        branch: row.get(3)?,
        timestamp: row.get(4)?,
        summary: row.get(5)?,
        status: row.get(6)?,
    })
}

fn run_command_from_row(row: &Row<'_>) -> rusqlite::Result<RunCommand> {
    Ok(RunCommand {
        id: row.get(0)?,
        project_id: row.get(1)?,
        label: row.get(2)?,
        command: row.get(3)?,
        last_verified_at: row.get(4)?,
        notes: row.get(5)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        blocked_by: row.get(5)?,
        created_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        project_id: row.get(1)?,
        snapshot_id: row.get(2)?,
        note_type: row.get(3)?,
        content: row.get(4)?,
        source_link: row.get(5)?,
        created_at: row.get(6)?,
    })
}
