//! Post commands through the binary.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_home() -> TempDir {
    TempDir::new().expect("create temp blogspace home")
}

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn seed_session(home: &TempDir) {
    let user = json!({
        "id": 7,
        "username": "ada",
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace"
    });
    let record = json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "user": user.to_string()
    });
    fs::write(home.path().join("session.json"), record.to_string()).unwrap();
}

fn post_json(id: i64, title: &str, author: Value) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": "Some content here",
        "author": author,
        "created_at": "2025-03-01T10:00:00Z"
    })
}

#[tokio::test]
async fn test_list_posts_normalizes_authors() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/blogs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            post_json(2, "Second post", json!({"id": 3, "full_name": "Grace Hopper"})),
            post_json(1, "First post", json!(12)),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args(["posts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Second post  by Grace Hopper"))
        .stdout(predicate::str::contains("First post  by Anonymous"));
}

#[tokio::test]
async fn test_list_posts_json() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/blogs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(
            1,
            "First post",
            json!("margaret")
        )])))
        .mount(&server)
        .await;

    let output = cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args(["posts", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let posts: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(posts[0]["title"], "First post");
    assert_eq!(posts[0]["author"]["display_name"], "margaret");
}

#[tokio::test]
async fn test_create_post_attributes_current_user() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home);
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/blogs/"))
        .and(bearer_token("access-1"))
        .and(body_json(
            json!({"title": "Hello world", "content": "Some content here"}),
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(post_json(
            9,
            "Hello world",
            json!(7),
        )))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args([
            "posts",
            "create",
            "--title",
            "Hello world",
            "--content",
            "Some content here",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created post 9: Hello world"))
        .stdout(predicate::str::contains("Author: Ada Lovelace"));
}

#[test]
fn test_create_post_validates_locally() {
    let home = temp_home();
    seed_session(&home);

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", "http://127.0.0.1:9/api/")
        .args(["posts", "create", "--title", "ab", "--content", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "title: Title must be at least 5 characters long",
        ))
        .stderr(predicate::str::contains(
            "content: Content must be at least 10 characters long",
        ));
}

#[test]
fn test_create_post_requires_login() {
    let home = temp_home();

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .args(["posts", "create", "--title", "Hello world", "--content", "Body"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_delete_asks_for_confirmation() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home);
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/blogs/4/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args(["posts", "delete", "4"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Delete cancelled."));

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args(["posts", "delete", "4", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted post 4"));
}

#[tokio::test]
async fn test_forbidden_edit_reports_server_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home);
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/blogs/4/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"detail": "You do not have permission to perform this action."}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("blogspace")
        .env("BLOGSPACE_HOME", home.path())
        .env("BLOGSPACE_API_URL", format!("{}/api/", server.uri()))
        .args(["posts", "edit", "4", "--title", "A new title"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "You do not have permission to perform this action.",
        ));

    assert!(home.path().join("session.json").exists());
}
