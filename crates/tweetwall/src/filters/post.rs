use serde::{Deserialize, Serialize};
use tweetwall_core::FilterDomain;

/// An incoming social media post.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    /// Author handle without the leading `@`.
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub possibly_sensitive: bool,
    /// Media URLs in attachment order.
    #[serde(default)]
    pub media: Vec<String>,
    /// The post this one reshares, if any.
    #[serde(default)]
    pub reposted: Option<Box<Post>>,
    /// The post this one quotes, if any.
    #[serde(default)]
    pub quoted: Option<Box<Post>>,
}

impl FilterDomain for Post {
    const DOMAIN_TYPE: &'static str = "Post";
}

impl Post {
    /// Creates a text post.
    pub fn new(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches a media URL.
    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media.push(url.into());
        self
    }

    /// Marks the post as possibly sensitive.
    pub fn sensitive(mut self) -> Self {
        self.possibly_sensitive = true;
        self
    }

    /// Makes this post a reshare of `original`.
    pub fn reposting(mut self, original: Post) -> Self {
        self.reposted = Some(Box::new(original));
        self
    }

    /// Makes this post quote `original`.
    pub fn quoting(mut self, original: Post) -> Self {
        self.quoted = Some(Box::new(original));
        self
    }

    /// Returns `true` if the post reshares another one.
    pub fn is_repost(&self) -> bool {
        self.reposted.is_some()
    }

    /// Authors of the reshared and quoted posts, following nested chains.
    pub fn related_authors(&self) -> Vec<&str> {
        let mut authors = Vec::new();
        let mut pending: Vec<&Post> = self
            .reposted
            .iter()
            .chain(self.quoted.iter())
            .map(|post| post.as_ref())
            .collect();
        while let Some(post) = pending.pop() {
            authors.push(post.author.as_str());
            pending.extend(post.reposted.iter().map(|p| p.as_ref()));
            pending.extend(post.quoted.iter().map(|p| p.as_ref()));
        }
        authors
    }

    /// The first image of the post, falling back to the reshared post's.
    pub fn first_media(&self) -> Option<&str> {
        self.media
            .first()
            .map(String::as_str)
            .or_else(|| self.reposted.as_ref().and_then(|p| p.first_media()))
    }
}

/// Normalises a handle for comparison.
pub(crate) fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_authors_walks_nested_posts() {
        let inner = Post::new("1", "carol", "original");
        let middle = Post::new("2", "bob", "quote").quoting(inner);
        let post = Post::new("3", "alice", "").reposting(middle);

        let mut authors = post.related_authors();
        authors.sort();
        assert_eq!(authors, vec!["bob", "carol"]);
        assert!(post.is_repost());
    }

    #[test]
    fn test_first_media_falls_back_to_repost() {
        let original = Post::new("1", "bob", "pic").with_media("https://img/1.png");
        let post = Post::new("2", "alice", "").reposting(original);
        assert_eq!(post.first_media(), Some("https://img/1.png"));
        assert_eq!(Post::new("3", "x", "").first_media(), None);
    }

    #[test]
    fn test_deserialize_minimal_post() {
        let post: Post = serde_json::from_str(r#"{ "id": "9", "author": "dave" }"#).unwrap();
        assert_eq!(post.author, "dave");
        assert!(post.media.is_empty());
        assert!(!post.possibly_sensitive);
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle(" @JavaLand "), "javaland");
    }
}
