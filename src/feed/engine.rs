use chrono::Utc;

use crate::feed::error::{FeedError, FeedResult};
use crate::feed::model::{
    validate_text, Comment, FeedLimits, NewPost, Post, Reaction, ReactionKind, User,
};
use crate::feed::view::{filtered_view, FeedQuery, FeedView};

/// What a reaction toggle did to a user's reaction on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Replaced { previous: ReactionKind },
    Removed,
}

impl ReactionChange {
    /// The toggle rule: at most one reaction per (user, post). The same kind
    /// again removes it, a different kind replaces it.
    pub fn decide(existing: Option<ReactionKind>, requested: ReactionKind) -> Self {
        match existing {
            None => ReactionChange::Added,
            Some(previous) if previous == requested => ReactionChange::Removed,
            Some(previous) => ReactionChange::Replaced { previous },
        }
    }
}

/// Fail with `Conflict` when the caller saw a different version of the post.
pub fn check_version(post: &Post, expected: Option<u64>) -> FeedResult<()> {
    match expected {
        Some(expected) if expected != post.version => Err(FeedError::Conflict {
            expected,
            actual: post.version,
        }),
        _ => Ok(()),
    }
}

/// The in-memory post collection and its mutations.
///
/// Posts are kept newest-first by insertion; display order always comes
/// from [`Feed::view`].
#[derive(Debug, Clone, Default)]
pub struct Feed {
    posts: Vec<Post>,
    limits: FeedLimits,
}

impl Feed {
    pub fn new(limits: FeedLimits) -> Self {
        Self {
            posts: Vec::new(),
            limits,
        }
    }

    /// Start from an existing collection, e.g. a demo dataset.
    pub fn with_posts(mut posts: Vec<Post>, limits: FeedLimits) -> Self {
        for post in &mut posts {
            post.recount();
        }
        Self { posts, limits }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn limits(&self) -> FeedLimits {
        self.limits
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    fn get_mut(&mut self, post_id: &str) -> FeedResult<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| FeedError::post_not_found(post_id))
    }

    pub fn create_post(&mut self, author: &mut User, draft: NewPost) -> FeedResult<Post> {
        let text = validate_text(&draft.text, self.limits.max_post_chars, "Post")?;

        let post = Post {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: author.id.clone(),
            author_name: author.pseudonym.clone(),
            text,
            media: draft.media,
            campus: draft.campus,
            created_at: Utc::now(),
            is_community: draft.is_community,
            reactions: Vec::new(),
            comments: Vec::new(),
            reaction_count: 0,
            comment_count: 0,
            version: 0,
        };

        self.posts.insert(0, post.clone());
        author.history.push(post.id.clone());
        tracing::debug!(post_id = %post.id, campus = %post.campus, "post created");
        Ok(post)
    }

    pub fn toggle_reaction(
        &mut self,
        post_id: &str,
        user_id: &str,
        kind: ReactionKind,
        expected_version: Option<u64>,
    ) -> FeedResult<Post> {
        let post = self.get_mut(post_id)?;
        check_version(post, expected_version)?;

        let existing = post.reactions.iter().position(|r| r.user_id == user_id);
        let change = ReactionChange::decide(existing.map(|i| post.reactions[i].kind), kind);

        match (change, existing) {
            (ReactionChange::Added, _) => post.reactions.push(Reaction {
                id: uuid::Uuid::now_v7().to_string(),
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
                kind,
            }),
            (ReactionChange::Replaced { .. }, Some(i)) => post.reactions[i].kind = kind,
            (ReactionChange::Removed, Some(i)) => {
                post.reactions.remove(i);
            }
            // decide() only yields Replaced/Removed when a reaction exists
            (_, None) => {}
        }

        post.recount();
        post.version += 1;
        tracing::debug!(post_id, user_id, ?change, "reaction toggled");
        Ok(post.clone())
    }

    pub fn add_comment(
        &mut self,
        post_id: &str,
        author: &User,
        text: &str,
        expected_version: Option<u64>,
    ) -> FeedResult<Post> {
        let text = validate_text(text, self.limits.max_comment_chars, "Comment")?;
        let post = self.get_mut(post_id)?;
        check_version(post, expected_version)?;

        post.comments.insert(
            0,
            Comment {
                id: uuid::Uuid::now_v7().to_string(),
                post_id: post_id.to_string(),
                user_id: author.id.clone(),
                author_name: author.pseudonym.clone(),
                text,
                created_at: Utc::now(),
            },
        );
        post.recount();
        post.version += 1;
        Ok(post.clone())
    }

    /// Remove a post together with its reactions and comments.
    pub fn delete_post(&mut self, post_id: &str, requester_id: &str) -> FeedResult<()> {
        let index = self
            .posts
            .iter()
            .position(|p| p.id == post_id)
            .ok_or_else(|| FeedError::post_not_found(post_id))?;

        if self.posts[index].user_id != requester_id {
            tracing::warn!(post_id, requester_id, "delete rejected for non-owner");
            return Err(FeedError::Forbidden(
                "Only the author can delete this post".into(),
            ));
        }

        self.posts.remove(index);
        Ok(())
    }

    pub fn view(&self, query: &FeedQuery) -> FeedView<'_> {
        filtered_view(&self.posts, query)
    }

    /// Posts owned by `user_id`, newest first.
    pub fn posts_by_author(&self, user_id: &str) -> Vec<&Post> {
        let mut owned: Vec<&Post> = self.posts.iter().filter(|p| p.user_id == user_id).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::Campus;

    fn setup() -> (Feed, User, User) {
        let feed = Feed::new(FeedLimits::default());
        (feed, User::new("a@vit.ac.in"), User::new("b@vit.ac.in"))
    }

    #[test]
    fn decide_covers_all_branches() {
        use ReactionKind::*;
        assert_eq!(ReactionChange::decide(None, Love), ReactionChange::Added);
        assert_eq!(ReactionChange::decide(Some(Love), Love), ReactionChange::Removed);
        assert_eq!(
            ReactionChange::decide(Some(Sad), Love),
            ReactionChange::Replaced { previous: Sad }
        );
    }

    #[test]
    fn create_post_prepends_and_records_history() {
        let (mut feed, mut alice, _) = setup();
        let first = feed
            .create_post(&mut alice, NewPost::confession("first", Campus::Vellore))
            .unwrap();
        let second = feed
            .create_post(&mut alice, NewPost::confession("second", Campus::Vellore))
            .unwrap();
        assert_eq!(feed.posts()[0].id, second.id);
        assert_eq!(feed.posts()[1].id, first.id);
        assert_eq!(alice.history, vec![first.id, second.id]);
        assert_eq!(second.author_name, alice.pseudonym);
        assert_eq!(second.reaction_count, 0);
        assert_eq!(second.comment_count, 0);
    }

    #[test]
    fn create_post_rejects_blank_and_oversized_text() {
        let (mut feed, mut alice, _) = setup();
        let err = feed
            .create_post(&mut alice, NewPost::confession("   ", Campus::Ap))
            .unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        let err = feed
            .create_post(&mut alice, NewPost::confession(&"x".repeat(1001), Campus::Ap))
            .unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
        assert!(feed.posts().is_empty());
        assert!(alice.history.is_empty());
    }

    #[test]
    fn replace_keeps_reaction_identity() {
        let (mut feed, mut alice, bob) = setup();
        let post = feed
            .create_post(&mut alice, NewPost::confession("hi", Campus::Ap))
            .unwrap();
        let p = feed
            .toggle_reaction(&post.id, &bob.id, ReactionKind::Wow, None)
            .unwrap();
        let original_id = p.reactions[0].id.clone();
        let p = feed
            .toggle_reaction(&post.id, &bob.id, ReactionKind::Sad, None)
            .unwrap();
        assert_eq!(p.reactions.len(), 1);
        assert_eq!(p.reactions[0].id, original_id);
        assert_eq!(p.reactions[0].kind, ReactionKind::Sad);
    }

    #[test]
    fn mutations_bump_version_and_reject_stale_writers() {
        let (mut feed, mut alice, bob) = setup();
        let post = feed
            .create_post(&mut alice, NewPost::confession("hi", Campus::Ap))
            .unwrap();
        let p = feed
            .toggle_reaction(&post.id, &bob.id, ReactionKind::Love, Some(0))
            .unwrap();
        assert_eq!(p.version, 1);

        let err = feed
            .add_comment(&post.id, &bob, "late", Some(0))
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::Conflict {
                expected: 0,
                actual: 1
            }
        ));
        assert_eq!(feed.get(&post.id).unwrap().comment_count, 0);
    }

    #[test]
    fn comment_on_missing_post_is_not_found() {
        let (mut feed, _, bob) = setup();
        let err = feed.add_comment("nope", &bob, "hello", None).unwrap_err();
        assert!(matches!(err, FeedError::NotFound { .. }));
    }

    #[test]
    fn delete_missing_post_is_not_found() {
        let (mut feed, alice, _) = setup();
        let err = feed.delete_post("nope", &alice.id).unwrap_err();
        assert!(matches!(err, FeedError::NotFound { .. }));
    }

    #[test]
    fn posts_by_author_uses_ownership() {
        let (mut feed, mut alice, mut bob) = setup();
        feed.create_post(&mut alice, NewPost::confession("a", Campus::Ap))
            .unwrap();
        feed.create_post(&mut bob, NewPost::confession("b", Campus::Ap))
            .unwrap();
        feed.create_post(&mut alice, NewPost::community("c", Campus::Ap))
            .unwrap();
        let mine: Vec<&str> = feed
            .posts_by_author(&alice.id)
            .into_iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(mine, vec!["c", "a"]);
    }

    #[test]
    fn with_posts_repairs_cached_counts() {
        let (mut feed, mut alice, bob) = setup();
        let post = feed
            .create_post(&mut alice, NewPost::confession("hi", Campus::Ap))
            .unwrap();
        let mut post = feed
            .toggle_reaction(&post.id, &bob.id, ReactionKind::Haha, None)
            .unwrap();
        post.reaction_count = 99;
        let feed = Feed::with_posts(vec![post], FeedLimits::default());
        assert!(feed.posts()[0].counts_consistent());
    }
}
