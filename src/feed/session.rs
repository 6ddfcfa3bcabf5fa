use crate::feed::engine::Feed;
use crate::feed::error::{FeedError, FeedResult};
use crate::feed::model::{NewPost, Post, ReactionKind, User};
use crate::feed::view::{FeedQuery, FeedView};

/// Session-scoped owner of the feed and the signed-in user.
///
/// UI layers hold one of these and route every user action through it;
/// actions that need an author fail with `Unauthenticated` while signed out.
#[derive(Debug, Default)]
pub struct Session {
    feed: Feed,
    current: Option<User>,
}

impl Session {
    pub fn new(feed: Feed) -> Self {
        Self {
            feed,
            current: None,
        }
    }

    /// Create a new account and sign it in. The pseudonym is drawn here,
    /// once, and never changes afterwards.
    pub fn sign_up(&mut self, email: &str) -> FeedResult<&User> {
        if email.trim().is_empty() {
            return Err(FeedError::Validation("Email is required".into()));
        }
        let user = User::new(email);
        tracing::info!(user_id = %user.id, pseudonym = %user.pseudonym, "account created");
        Ok(self.current.insert(user))
    }

    /// Sign in a user supplied by an external identity service.
    pub fn sign_in(&mut self, user: User) {
        self.current = Some(user);
    }

    pub fn sign_out(&mut self) -> Option<User> {
        self.current.take()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    fn require_user(&self) -> FeedResult<&User> {
        self.current.as_ref().ok_or(FeedError::Unauthenticated)
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn create_post(&mut self, draft: NewPost) -> FeedResult<Post> {
        let author = self.current.as_mut().ok_or(FeedError::Unauthenticated)?;
        self.feed.create_post(author, draft)
    }

    pub fn react(&mut self, post_id: &str, kind: ReactionKind) -> FeedResult<Post> {
        let user_id = self.require_user()?.id.clone();
        self.feed.toggle_reaction(post_id, &user_id, kind, None)
    }

    pub fn comment(&mut self, post_id: &str, text: &str) -> FeedResult<Post> {
        let author = self.current.as_ref().ok_or(FeedError::Unauthenticated)?;
        self.feed.add_comment(post_id, author, text, None)
    }

    /// Delete one of the current user's posts and drop it from their history.
    pub fn delete_post(&mut self, post_id: &str) -> FeedResult<()> {
        let user = self.current.as_mut().ok_or(FeedError::Unauthenticated)?;
        self.feed.delete_post(post_id, &user.id)?;
        user.history.retain(|id| id != post_id);
        Ok(())
    }

    pub fn view(&self, query: &FeedQuery) -> FeedView<'_> {
        self.feed.view(query)
    }

    /// The signed-in user's own posts; empty while signed out.
    pub fn my_posts(&self) -> Vec<&Post> {
        match &self.current {
            Some(user) => self.feed.posts_by_author(&user.id),
            None => Vec::new(),
        }
    }
}
