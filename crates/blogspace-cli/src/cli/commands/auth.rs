//! Auth command handlers.

use anyhow::Result;
use blogspace_core::SessionManager;
use blogspace_core::models::{Credentials, Registration, User, mask_token};

use super::{print_field_errors, prompt};

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    bio: Option<String>,
}

pub async fn login(manager: &mut SessionManager, username: Option<String>) -> Result<()> {
    if let Some(existing) = manager.initialize().user() {
        println!("Currently logged in as {}.", existing.username);
    }

    let username = match username {
        Some(name) => name,
        None => prompt("Username: ")?,
    };
    let password = prompt("Password: ")?;

    let credentials = Credentials { username, password };
    let result = manager.login(&credentials).await;
    match result {
        Ok(user) => {
            print_signed_in("Logged in", &user, manager);
            Ok(())
        }
        Err(err) => {
            print_field_errors(&err);
            Err(session_failure(manager))
        }
    }
}

pub async fn register(manager: &mut SessionManager, args: RegisterArgs) -> Result<()> {
    manager.initialize();

    let password = prompt("Password: ")?;
    let password_confirm = prompt("Confirm password: ")?;

    let registration = Registration {
        username: args.username,
        email: args.email,
        first_name: args.first_name,
        last_name: args.last_name,
        password,
        password_confirm,
        bio: args.bio.unwrap_or_default(),
    };

    let result = manager.register(&registration).await;
    match result {
        Ok(user) => {
            print_signed_in("Registered", &user, manager);
            Ok(())
        }
        Err(err) => {
            print_field_errors(&err);
            Err(session_failure(manager))
        }
    }
}

pub async fn logout(manager: &mut SessionManager) -> Result<()> {
    let was_signed_in = manager.initialize().is_authenticated();
    manager.logout().await;

    if was_signed_in {
        println!("✓ Logged out");
        println!(
            "  Session removed from: {}",
            manager.gateway().store().path().display()
        );
    } else {
        println!("Not logged in (no session found).");
    }
    Ok(())
}

pub fn whoami(manager: &mut SessionManager) -> Result<()> {
    let Some(user) = manager.initialize().user().cloned() else {
        println!("Not logged in.");
        return Ok(());
    };

    println!("{} ({})", user.username, user.display_name());
    if !user.email.is_empty() {
        println!("  Email: {}", user.email);
    }
    if let Some(token) = manager.gateway().store().access_token() {
        println!("  Token: {}", mask_token(&token));
    }
    Ok(())
}

fn print_signed_in(verb: &str, user: &User, manager: &SessionManager) {
    println!("✓ {verb} as {} ({})", user.username, user.display_name());
    println!(
        "  Session saved to: {}",
        manager.gateway().store().path().display()
    );
}

/// The message the session recorded for the failed attempt.
fn session_failure(manager: &mut SessionManager) -> anyhow::Error {
    let message = manager
        .session()
        .error()
        .unwrap_or("Request failed. Please try again.");
    anyhow::anyhow!("{message}")
}
