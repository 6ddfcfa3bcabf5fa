use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::error::FeedError;
use crate::identity;

// --- Closed enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Campus {
    Vellore,
    Chennai,
    Bhopal,
    Ap,
}

impl Campus {
    pub const ALL: [Campus; 4] = [Campus::Vellore, Campus::Chennai, Campus::Bhopal, Campus::Ap];

    pub fn as_str(&self) -> &'static str {
        match self {
            Campus::Vellore => "vellore",
            Campus::Chennai => "chennai",
            Campus::Bhopal => "bhopal",
            Campus::Ap => "ap",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Campus::Vellore => "VIT Vellore",
            Campus::Chennai => "VIT Chennai",
            Campus::Bhopal => "VIT Bhopal",
            Campus::Ap => "VIT-AP",
        }
    }

    /// Parse a campus filter where `"all"` (or nothing) means no filter.
    pub fn parse_filter(raw: Option<&str>) -> Result<Option<Campus>, FeedError> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(other) => other.parse().map(Some),
        }
    }
}

impl FromStr for Campus {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Campus::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FeedError::Validation(format!("Unknown campus: {}", s)))
    }
}

impl fmt::Display for Campus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Love,
        ReactionKind::Haha,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Love => "love",
            ReactionKind::Haha => "haha",
            ReactionKind::Wow => "wow",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ReactionKind::Love => "❤️",
            ReactionKind::Haha => "😂",
            ReactionKind::Wow => "🤯",
            ReactionKind::Sad => "😢",
            ReactionKind::Angry => "😠",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FeedError::Validation(format!("Unknown reaction kind: {}", s)))
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Classify a declared content type. Anything that is neither an image
    /// nor a video is not accepted as post media.
    pub fn from_content_type(content_type: &str) -> Option<MediaKind> {
        let essence = content_type.trim().to_ascii_lowercase();
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl FromStr for MediaKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(FeedError::Validation(format!("Unknown media kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

// --- Entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub pseudonym: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Posts authored during this session, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
}

impl User {
    /// Create a fresh account with a newly drawn pseudonym.
    pub fn new(email: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            pseudonym: identity::generate_name(),
            email: normalize_email(email),
            created_at: Utc::now(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    /// Pseudonym of the author when the comment was written.
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub text: String,
    pub media: Option<MediaRef>,
    pub campus: Campus,
    pub created_at: DateTime<Utc>,
    pub is_community: bool,
    pub reactions: Vec<Reaction>,
    /// Newest first.
    pub comments: Vec<Comment>,
    pub reaction_count: usize,
    pub comment_count: usize,
    pub version: u64,
}

impl Post {
    /// The kind of reaction `user_id` currently has on this post.
    pub fn reaction_of(&self, user_id: &str) -> Option<ReactionKind> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.kind)
    }

    /// Count of each reaction kind, in enumeration order, skipping zeroes.
    pub fn reaction_breakdown(&self) -> Vec<(ReactionKind, usize)> {
        ReactionKind::ALL
            .into_iter()
            .map(|kind| (kind, self.reactions.iter().filter(|r| r.kind == kind).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn counts_consistent(&self) -> bool {
        self.reaction_count == self.reactions.len() && self.comment_count == self.comments.len()
    }

    pub(crate) fn recount(&mut self) {
        self.reaction_count = self.reactions.len();
        self.comment_count = self.comments.len();
    }
}

/// A post as submitted by its author, before the engine accepts it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub text: String,
    pub campus: Campus,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub is_community: bool,
}

impl NewPost {
    pub fn confession(text: &str, campus: Campus) -> Self {
        Self {
            text: text.to_string(),
            campus,
            media: None,
            is_community: false,
        }
    }

    pub fn community(text: &str, campus: Campus) -> Self {
        Self {
            is_community: true,
            ..Self::confession(text, campus)
        }
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }
}

/// Text limits, counted in characters after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub max_post_chars: usize,
    pub max_comment_chars: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            max_post_chars: 1000,
            max_comment_chars: 500,
        }
    }
}

/// Accounts are keyed by trimmed, lower-cased email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim `text` and check it is non-empty and within `max_chars`.
pub fn validate_text(text: &str, max_chars: usize, what: &str) -> Result<String, FeedError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FeedError::Validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(FeedError::Validation(format!(
            "{} must be {} characters or less",
            what, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campus_round_trips_through_str() {
        for campus in Campus::ALL {
            assert_eq!(campus.as_str().parse::<Campus>().unwrap(), campus);
        }
        assert!("mumbai".parse::<Campus>().is_err());
    }

    #[test]
    fn campus_filter_treats_all_as_none() {
        assert_eq!(Campus::parse_filter(None).unwrap(), None);
        assert_eq!(Campus::parse_filter(Some("all")).unwrap(), None);
        assert_eq!(Campus::parse_filter(Some("")).unwrap(), None);
        assert_eq!(
            Campus::parse_filter(Some("bhopal")).unwrap(),
            Some(Campus::Bhopal)
        );
        assert!(Campus::parse_filter(Some("delhi")).is_err());
    }

    #[test]
    fn campus_display_names() {
        assert_eq!(Campus::Ap.display_name(), "VIT-AP");
        assert_eq!(Campus::Vellore.display_name(), "VIT Vellore");
    }

    #[test]
    fn reaction_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ReactionKind::Haha).unwrap();
        assert_eq!(json, "\"haha\"");
        let kind: ReactionKind = serde_json::from_str("\"angry\"").unwrap();
        assert_eq!(kind, ReactionKind::Angry);
    }

    #[test]
    fn media_kind_from_content_type() {
        assert_eq!(MediaKind::from_content_type("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_content_type("Video/MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_content_type("application/pdf"), None);
    }

    #[test]
    fn new_user_gets_pseudonym_and_empty_history() {
        let user = User::new(" SomeOne@VITBhopal.ac.in ");
        assert_eq!(user.email, "someone@vitbhopal.ac.in");
        assert_eq!(user.pseudonym.split(' ').count(), 2);
        assert!(user.history.is_empty());
    }

    #[test]
    fn validate_text_trims_and_bounds() {
        assert_eq!(validate_text("  hi  ", 10, "Post").unwrap(), "hi");
        assert!(matches!(
            validate_text("   ", 10, "Post"),
            Err(FeedError::Validation(_))
        ));
        assert!(validate_text(&"a".repeat(10), 10, "Post").is_ok());
        assert!(validate_text(&"a".repeat(11), 10, "Post").is_err());
    }

    #[test]
    fn validate_text_counts_characters_not_bytes() {
        let hearts = "❤".repeat(10);
        assert!(hearts.len() > 10);
        assert!(validate_text(&hearts, 10, "Post").is_ok());
    }

    #[test]
    fn new_post_builders() {
        let draft = NewPost::community("Movie night", Campus::Chennai);
        assert!(draft.is_community);
        assert_eq!(draft.campus, Campus::Chennai);
        let draft = NewPost::confession("x", Campus::Ap).with_media(MediaRef {
            url: "/media/a.png".into(),
            kind: MediaKind::Image,
        });
        assert!(!draft.is_community);
        assert!(draft.media.is_some());
    }
}
