//! Profile command handlers.

use anyhow::Result;
use blogspace_core::SessionManager;
use blogspace_core::models::{ProfileUpdate, User};

use super::{api_failure, require_login};

pub async fn show(manager: &mut SessionManager) -> Result<()> {
    require_login(manager)?;
    let result = manager.fetch_profile().await;
    let user = result.map_err(|err| api_failure(manager, err))?;
    print_profile(&user);
    Ok(())
}

pub async fn update(manager: &mut SessionManager, update: &ProfileUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass --first-name, --last-name or --bio.");
    }
    require_login(manager)?;

    let result = manager.update_profile(update).await;
    let user = result.map_err(|err| api_failure(manager, err))?;
    println!("✓ Profile updated");
    print_profile(&user);
    Ok(())
}

fn print_profile(user: &User) {
    println!("Username: {}", user.username);
    println!("Name:     {}", user.display_name());
    println!("Email:    {}", user.email);
    if !user.bio.is_empty() {
        println!("Bio:      {}", user.bio);
    }
}
