use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::SqliteFeed;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::feed::{Campus, FeedQuery, MediaRef, NewPost, Post, ReactionKind, Section};
use crate::identity;
use crate::state::AppState;

// --- View structs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub kind: ReactionKind,
    pub emoji: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A post as shown to one viewer. Account ids are never exposed.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub author_name: String,
    pub author_initials: String,
    pub text: String,
    pub media: Option<MediaRef>,
    pub campus: Campus,
    pub campus_name: String,
    pub created_at: DateTime<Utc>,
    pub is_community: bool,
    pub reaction_count: usize,
    pub comment_count: usize,
    pub version: u64,
    pub reactions: Vec<ReactionSummary>,
    pub comments: Vec<CommentView>,
    pub my_reaction: Option<ReactionKind>,
    pub can_delete: bool,
}

impl PostView {
    pub fn new(post: Post, viewer_id: Option<&str>) -> Self {
        let reactions = post
            .reaction_breakdown()
            .into_iter()
            .map(|(kind, count)| ReactionSummary {
                kind,
                emoji: kind.emoji().to_string(),
                count,
            })
            .collect();
        let my_reaction = viewer_id.and_then(|id| post.reaction_of(id));
        let can_delete = viewer_id == Some(post.user_id.as_str());

        PostView {
            author_initials: identity::initials(&post.author_name),
            campus_name: post.campus.display_name().to_string(),
            reactions,
            my_reaction,
            can_delete,
            comments: post
                .comments
                .into_iter()
                .map(|c| CommentView {
                    id: c.id,
                    author_name: c.author_name,
                    text: c.text,
                    created_at: c.created_at,
                })
                .collect(),
            id: post.id,
            author_name: post.author_name,
            text: post.text,
            media: post.media,
            campus: post.campus,
            created_at: post.created_at,
            is_community: post.is_community,
            reaction_count: post.reaction_count,
            comment_count: post.comment_count,
            version: post.version,
        }
    }
}

// --- Requests ---

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub section: Option<String>,
    pub campus: Option<String>,
    pub q: Option<String>,
}

impl ListParams {
    fn to_query(&self) -> AppResult<FeedQuery> {
        let section = match self.section.as_deref() {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => Section::default(),
        };
        let campus = Campus::parse_filter(self.campus.as_deref())?;
        Ok(FeedQuery::new(section)
            .campus(campus)
            .search(self.q.as_deref().unwrap_or("")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub kind: ReactionKind,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
        .route("/api/posts/{id}/reactions", post(toggle_reaction))
        .route("/api/posts/{id}/comments", post(add_comment))
        .route("/api/me/posts", get(my_posts))
}

// --- Handlers ---

fn viewer_id(user: &MaybeUser) -> Option<&str> {
    user.0.as_ref().map(|u| u.user.id.as_str())
}

async fn list_posts(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<PostView>>> {
    let query = params.to_query()?;
    let mut conn = state.db.get()?;
    let posts = SqliteFeed::new(&mut conn, state.config.feed.limits()).list(&query)?;

    let viewer = viewer_id(&user);
    Ok(Json(
        posts
            .into_iter()
            .map(|p| PostView::new(p, viewer))
            .collect(),
    ))
}

async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<NewPost>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let post = SqliteFeed::new(&mut conn, state.config.feed.limits())
        .create_post(&current.user, draft)?;
    tracing::info!(post_id = %post.id, community = post.is_community, "post published");

    let view = PostView::new(post, Some(&current.user.id));
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_post(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let mut conn = state.db.get()?;
    let post = SqliteFeed::new(&mut conn, state.config.feed.limits()).get_post(&id)?;
    Ok(Json(PostView::new(post, viewer_id(&user))))
}

async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    SqliteFeed::new(&mut conn, state.config.feed.limits()).delete_post(&id, &current.user.id)?;
    tracing::info!(post_id = %id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_reaction(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ReactionRequest>,
) -> AppResult<Json<PostView>> {
    let mut conn = state.db.get()?;
    let post = SqliteFeed::new(&mut conn, state.config.feed.limits()).toggle_reaction(
        &id,
        &current.user.id,
        req.kind,
        req.expected_version,
    )?;
    Ok(Json(PostView::new(post, Some(&current.user.id))))
}

async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let post = SqliteFeed::new(&mut conn, state.config.feed.limits()).add_comment(
        &id,
        &current.user,
        &req.text,
        req.expected_version,
    )?;
    let view = PostView::new(post, Some(&current.user.id));
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn my_posts(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<PostView>>> {
    let mut conn = state.db.get()?;
    let posts =
        SqliteFeed::new(&mut conn, state.config.feed.limits()).posts_by_author(&current.user.id)?;
    Ok(Json(
        posts
            .into_iter()
            .map(|p| PostView::new(p, Some(&current.user.id)))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Comment, Reaction};

    fn sample_post() -> Post {
        Post {
            id: "p1".into(),
            user_id: "owner".into(),
            author_name: "Gentle Otter".into(),
            text: "hello".into(),
            media: None,
            campus: Campus::Bhopal,
            created_at: Utc::now(),
            is_community: false,
            reactions: vec![
                Reaction {
                    id: "r1".into(),
                    post_id: "p1".into(),
                    user_id: "viewer".into(),
                    kind: ReactionKind::Wow,
                },
                Reaction {
                    id: "r2".into(),
                    post_id: "p1".into(),
                    user_id: "owner".into(),
                    kind: ReactionKind::Wow,
                },
            ],
            comments: vec![Comment {
                id: "c1".into(),
                post_id: "p1".into(),
                user_id: "viewer".into(),
                author_name: "Keen Hawk".into(),
                text: "nice".into(),
                created_at: Utc::now(),
            }],
            reaction_count: 2,
            comment_count: 1,
            version: 3,
        }
    }

    #[test]
    fn view_is_personalised_for_viewer() {
        let view = PostView::new(sample_post(), Some("viewer"));
        assert_eq!(view.my_reaction, Some(ReactionKind::Wow));
        assert!(!view.can_delete);
        assert_eq!(view.author_initials, "GO");
        assert_eq!(view.campus_name, "VIT Bhopal");
        assert_eq!(view.reactions.len(), 1);
        assert_eq!(view.reactions[0].count, 2);

        let owner_view = PostView::new(sample_post(), Some("owner"));
        assert!(owner_view.can_delete);

        let anonymous = PostView::new(sample_post(), None);
        assert_eq!(anonymous.my_reaction, None);
        assert!(!anonymous.can_delete);
    }

    #[test]
    fn view_hides_account_ids() {
        let json = serde_json::to_string(&PostView::new(sample_post(), None)).unwrap();
        assert!(!json.contains("owner"));
        assert!(!json.contains("viewer"));
    }

    #[test]
    fn list_params_default_to_confessions_everywhere() {
        let query = ListParams::default().to_query().unwrap();
        assert_eq!(query.section, Section::Confessions);
        assert_eq!(query.campus, None);
        assert_eq!(query.search_text(), None);
    }

    #[test]
    fn list_params_reject_unknown_values() {
        let params = ListParams {
            section: Some("groups".into()),
            ..Default::default()
        };
        assert!(params.to_query().is_err());
        let params = ListParams {
            campus: Some("pune".into()),
            ..Default::default()
        };
        assert!(params.to_query().is_err());
    }
}
