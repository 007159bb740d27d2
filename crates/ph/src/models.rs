//! Entity records persisted by the project history store
//!
//! Five tables: projects, snapshots, run_commands, tasks, notes.
//! Timestamps are RFC 3339 strings so lexicographic order matches
//! chronological order.

use serde::{Deserialize, Serialize};

/// A tracked repository, keyed by its root filesystem path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub root_path: String,
    pub remote_url: Option<String>,
    pub description: String,
    /// Ordered stack tags, stored as a JSON array in a TEXT column
    pub stack: Vec<String>,
    pub status: String,
}

/// An immutable record of project state, optionally tied to a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub project_id: i64,
    pub git_commit: Option<String>,
    pub branch: Option<String>,
    pub timestamp: String,
    pub summary: String,
    /// Free-form tag: green, broken, refactor, spike, unknown
    pub status: String,
}

/// A named "how to run this" recipe, unique per (project, label)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommand {
    pub id: i64,
    pub project_id: i64,
    pub label: String,
    pub command: String,
    pub last_verified_at: Option<String>,
    pub notes: Option<String>,
}

/// A to-do item with priority and lifecycle status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    /// todo | doing | done | blocked
    pub status: String,
    /// 1=high, 2=medium, 3=low
    pub priority: i64,
    /// Another task that must finish first
    pub blocked_by: Option<i64>,
    pub created_at: String,
    /// Set exactly when status transitions to done
    pub completed_at: Option<String>,
}

/// Free-form attached text, optionally tied to a snapshot at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub project_id: i64,
    pub snapshot_id: Option<i64>,
    /// chatgpt | manual | decision | bug
    pub note_type: String,
    pub content: String,
    pub source_link: Option<String>,
    pub created_at: String,
}
