//! CLI command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use blogspace_core::models::User;
use blogspace_core::{ApiError, SessionManager};

pub mod auth;
pub mod config;
pub mod posts;
pub mod profile;

/// Prints `label` and reads one line from stdin, without the line ending.
fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Restores the stored session and returns its user, or fails with a login
/// hint when there is none.
fn require_login(manager: &mut SessionManager) -> Result<User> {
    manager
        .initialize()
        .user()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `blogspace login` first."))
}

/// Applies pending gateway events, prints per-field problems, and hands the
/// error back for `main` to report.
fn api_failure(manager: &mut SessionManager, err: ApiError) -> anyhow::Error {
    manager.poll_events();
    print_field_errors(&err);
    err.into()
}

fn print_field_errors(err: &ApiError) {
    for (field, message) in err.field_errors.iter() {
        eprintln!("  {field}: {message}");
    }
}
