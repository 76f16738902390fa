//! Blog post endpoints.
//!
//! Thin typed wrappers: path construction, payload shaping, and local
//! validation before anything is sent.

use serde::Deserialize;

use super::{ApiError, ApiGateway, ApiRequest, ApiResult};
use crate::models::{Post, PostDraft, PostPatch};
use crate::validation::validate_blog;

const POSTS_PATH: &str = "blogs/";
const MY_POSTS_PATH: &str = "blogs/my_blogs/";

fn post_path(id: i64) -> String {
    format!("blogs/{id}/")
}

/// List endpoints answer with a bare array, or with a page object when the
/// backend has pagination enabled.
#[derive(Deserialize)]
#[serde(untagged)]
enum PostList {
    Plain(Vec<Post>),
    Page { results: Vec<Post> },
}

impl From<PostList> for Vec<Post> {
    fn from(list: PostList) -> Self {
        match list {
            PostList::Plain(posts) | PostList::Page { results: posts } => posts,
        }
    }
}

impl ApiGateway {
    /// `GET blogs/`, newest first as ordered by the backend.
    pub async fn list_posts(&self) -> ApiResult<Vec<Post>> {
        let list: PostList = self.fetch_json(&ApiRequest::get(POSTS_PATH)).await?;
        Ok(list.into())
    }

    /// `GET blogs/my_blogs/`: posts written by the current user.
    pub async fn list_my_posts(&self) -> ApiResult<Vec<Post>> {
        let list: PostList = self.fetch_json(&ApiRequest::get(MY_POSTS_PATH)).await?;
        Ok(list.into())
    }

    /// `GET blogs/{id}/`.
    pub async fn get_post(&self, id: i64) -> ApiResult<Post> {
        self.fetch_json(&ApiRequest::get(post_path(id))).await
    }

    /// `POST blogs/`. The draft is validated locally first.
    pub async fn create_post(&self, draft: &PostDraft) -> ApiResult<Post> {
        if let Some(errors) = validate_blog(draft) {
            return Err(ApiError::validation(errors));
        }
        let request = ApiRequest::post(POSTS_PATH).json(draft)?;
        self.fetch_json(&request).await
    }

    /// `PATCH blogs/{id}/`. Only the changed fields are validated and sent.
    pub async fn update_post(&self, id: i64, patch: &PostPatch) -> ApiResult<Post> {
        if let Some(errors) = patch.validate() {
            return Err(ApiError::validation(errors));
        }
        let request = ApiRequest::patch(post_path(id)).json(patch)?;
        self.fetch_json(&request).await
    }

    /// `DELETE blogs/{id}/`.
    pub async fn delete_post(&self, id: i64) -> ApiResult<()> {
        self.fetch_empty(&ApiRequest::delete(post_path(id))).await
    }
}
