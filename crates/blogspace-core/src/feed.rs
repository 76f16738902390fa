//! Client-side list of posts with stale-response protection.
//!
//! A view layer that keeps posts on screen across requests owns one
//! [`PostFeed`]. Each load takes a [`FetchTicket`]; only the newest ticket
//! may replace the list, so a slow earlier response cannot overwrite a newer
//! one. Created posts go through [`PostFeed::prepend_created`] so they show
//! up first with the signed-in author attached. One-shot callers such as the
//! CLI read gateway results directly.

use crate::models::{Post, User};

/// Identifies one list load. Issued by [`PostFeed::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct PostFeed {
    posts: Vec<Post>,
    issued: u64,
    loading: bool,
}

impl PostFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn get(&self, id: i64) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Starts a load, invalidating every earlier ticket.
    pub fn begin_load(&mut self) -> FetchTicket {
        self.issued += 1;
        self.loading = true;
        FetchTicket(self.issued)
    }

    /// Installs `posts` if `ticket` is still the newest. Returns whether the
    /// list was replaced.
    pub fn finish_load(&mut self, ticket: FetchTicket, posts: Vec<Post>) -> bool {
        if ticket.0 != self.issued {
            return false;
        }
        self.posts = posts;
        self.loading = false;
        true
    }

    /// Ends a failed load. Stale failures are ignored.
    pub fn abandon_load(&mut self, ticket: FetchTicket) {
        if ticket.0 == self.issued {
            self.loading = false;
        }
    }

    /// Puts a just-created post at the top of the list, attributing it to
    /// `author` when the server response left the author out.
    pub fn prepend_created(&mut self, post: Post, author: &User) {
        let post = post.attributed_to(author);
        self.posts.retain(|p| p.id != post.id);
        self.posts.insert(0, post);
    }

    /// Swaps in an updated copy. Returns `false` if the post isn't listed.
    pub fn replace(&mut self, post: Post) -> bool {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => {
                *slot = post;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<Post> {
        let index = self.posts.iter().position(|p| p.id == id)?;
        Some(self.posts.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn post(id: i64, title: &str) -> Post {
        serde_json::from_value(json!({
            "id": id, "title": title, "content": "body text here", "author_name": "Grace"
        }))
        .unwrap()
    }

    fn user() -> User {
        User {
            id: 3,
            username: "ada".to_string(),
            email: String::new(),
            first_name: "Ada".to_string(),
            last_name: String::new(),
            bio: String::new(),
        }
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut feed = PostFeed::new();
        let first = feed.begin_load();
        let second = feed.begin_load();

        assert!(feed.finish_load(second, vec![post(2, "Newer list")]));
        assert!(!feed.finish_load(first, vec![post(1, "Older list")]));

        assert_eq!(feed.posts().len(), 1);
        assert_eq!(feed.posts()[0].id, 2);
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_stale_failure_keeps_loading_flag() {
        let mut feed = PostFeed::new();
        let first = feed.begin_load();
        let _second = feed.begin_load();
        feed.abandon_load(first);
        assert!(feed.is_loading());
    }

    #[test]
    fn test_prepend_created_attributes_author() {
        let mut feed = PostFeed::new();
        let ticket = feed.begin_load();
        feed.finish_load(ticket, vec![post(1, "Existing post")]);

        let created: Post =
            serde_json::from_value(json!({"id": 2, "title": "Fresh", "content": "x", "author": 3}))
                .unwrap();
        feed.prepend_created(created, &user());

        assert_eq!(feed.posts()[0].id, 2);
        assert_eq!(feed.posts()[0].author.display_name, "Ada");
        assert_eq!(feed.posts().len(), 2);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut feed = PostFeed::new();
        let ticket = feed.begin_load();
        feed.finish_load(ticket, vec![post(1, "One post"), post(2, "Two post")]);

        assert!(feed.replace(post(2, "Renamed")));
        assert_eq!(feed.get(2).map(|p| p.title.as_str()), Some("Renamed"));
        assert!(!feed.replace(post(9, "Missing")));

        assert_eq!(feed.remove(1).map(|p| p.id), Some(1));
        assert_eq!(feed.remove(1), None);
        assert_eq!(feed.posts().len(), 1);
    }
}
