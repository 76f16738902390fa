//! Post command handlers.

use anyhow::{Context, Result};
use blogspace_core::models::{Post, PostDraft, PostPatch};
use blogspace_core::SessionManager;
use chrono::Local;

use super::{api_failure, confirm, require_login};

pub async fn list(manager: &mut SessionManager, mine: bool, json: bool) -> Result<()> {
    if mine {
        require_login(manager)?;
    } else {
        manager.initialize();
    }

    let result = if mine {
        manager.gateway().list_my_posts().await
    } else {
        manager.gateway().list_posts().await
    };
    let posts = result.map_err(|err| api_failure(manager, err))?;

    if json {
        let out = serde_json::to_string_pretty(&posts).context("serialize posts")?;
        println!("{out}");
        return Ok(());
    }

    if posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }
    for post in &posts {
        println!(
            "{:>5}  {}  by {}  {}",
            post.id,
            post.title,
            post.author.display_name,
            created(post)
        );
    }
    Ok(())
}

pub async fn show(manager: &mut SessionManager, id: i64, json: bool) -> Result<()> {
    manager.initialize();
    let result = manager.gateway().get_post(id).await;
    let post = result.map_err(|err| api_failure(manager, err))?;

    if json {
        let out = serde_json::to_string_pretty(&post).context("serialize post")?;
        println!("{out}");
    } else {
        println!("{}", post.title);
        println!("by {}  {}", post.author.display_name, created(&post));
        println!();
        println!("{}", post.content);
    }
    Ok(())
}

pub async fn create(manager: &mut SessionManager, title: String, content: String) -> Result<()> {
    let user = require_login(manager)?;

    let draft = PostDraft { title, content };
    let result = manager.gateway().create_post(&draft).await;
    let post = result
        .map_err(|err| api_failure(manager, err))?
        .attributed_to(&user);

    println!("✓ Created post {}: {}", post.id, post.title);
    println!("  Author: {}", post.author.display_name);
    Ok(())
}

pub async fn edit(
    manager: &mut SessionManager,
    id: i64,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    let patch = PostPatch { title, content };
    if patch.is_empty() {
        anyhow::bail!("Nothing to change. Pass --title and/or --content.");
    }
    require_login(manager)?;

    let result = manager.gateway().update_post(id, &patch).await;
    let post = result.map_err(|err| api_failure(manager, err))?;

    println!("✓ Updated post {}: {}", post.id, post.title);
    Ok(())
}

pub async fn delete(manager: &mut SessionManager, id: i64, yes: bool) -> Result<()> {
    require_login(manager)?;

    if !yes && !confirm(&format!("Delete post {id}?"))? {
        println!("Delete cancelled.");
        return Ok(());
    }

    let result = manager.gateway().delete_post(id).await;
    result.map_err(|err| api_failure(manager, err))?;
    println!("✓ Deleted post {id}");
    Ok(())
}

fn created(post: &Post) -> String {
    post.created_at
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
