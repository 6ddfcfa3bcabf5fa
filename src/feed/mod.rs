//! The feed state engine: posts, reactions, comments and derived views.

pub mod engine;
pub mod error;
pub mod model;
pub mod session;
pub mod view;

pub use engine::{check_version, Feed, ReactionChange};
pub use error::{FeedError, FeedResult};
pub use model::{
    normalize_email, validate_text, Campus, Comment, FeedLimits, MediaKind, MediaRef, NewPost, Post, Reaction,
    ReactionKind, User,
};
pub use session::Session;
pub use view::{filtered_view, FeedQuery, FeedView, Section};
