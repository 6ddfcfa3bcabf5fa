use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::feed::{
    check_version, filtered_view, normalize_email, validate_text, Comment, FeedError, FeedLimits, FeedQuery,
    FeedResult, MediaRef, NewPost, Post, Reaction, ReactionChange, ReactionKind, Section, User,
};

/// The feed engine backed by SQLite.
///
/// Each mutation runs in one IMMEDIATE transaction, so the version check,
/// the write and the version bump are atomic with respect to other
/// sessions. Counts are always computed from the child tables.
pub struct SqliteFeed<'c> {
    conn: &'c mut Connection,
    limits: FeedLimits,
}

// --- Column helpers ---

pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = FeedError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        pseudonym: row.get(1)?,
        email: row.get(2)?,
        created_at: ts_column(row, 3)?,
        history: Vec::new(),
    })
}

const POST_COLUMNS: &str = "p.id, p.user_id, u.pseudonym, p.body, p.media_url, p.media_kind,
     p.campus, p.created_at, p.is_community, p.version";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let media_url: Option<String> = row.get(4)?;
    let media = match media_url {
        Some(url) => Some(MediaRef {
            url,
            kind: enum_column(row, 5)?,
        }),
        None => None,
    };
    let version: i64 = row.get(9)?;

    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author_name: row.get(2)?,
        text: row.get(3)?,
        media,
        campus: enum_column(row, 6)?,
        created_at: ts_column(row, 7)?,
        is_community: row.get(8)?,
        reactions: Vec::new(),
        comments: Vec::new(),
        reaction_count: 0,
        comment_count: 0,
        version: version as u64,
    })
}

/// Fill in reactions and comments, then derive the counts from them.
fn load_children(conn: &Connection, post: &mut Post) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, post_id, user_id, kind FROM reactions
         WHERE post_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    post.reactions = stmt
        .query_map(params![post.id], |row| {
            Ok(Reaction {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                kind: enum_column(row, 3)?,
            })
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, post_id, user_id, author_name, body, created_at FROM comments
         WHERE post_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    post.comments = stmt
        .query_map(params![post.id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                author_name: row.get(3)?,
                text: row.get(4)?,
                created_at: ts_column(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<_>>()?;

    post.recount();
    Ok(())
}

fn fetch_post(conn: &Connection, post_id: &str) -> FeedResult<Post> {
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?1",
        POST_COLUMNS
    );
    let mut post = conn
        .query_row(&sql, params![post_id], post_from_row)
        .optional()?
        .ok_or_else(|| FeedError::post_not_found(post_id))?;
    load_children(conn, &mut post)?;
    Ok(post)
}

fn fetch_posts(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> FeedResult<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.user_id
         WHERE {}
         ORDER BY p.created_at DESC, p.rowid DESC",
        POST_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut posts: Vec<Post> = stmt
        .query_map(args, post_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    for post in &mut posts {
        load_children(conn, post)?;
    }
    Ok(posts)
}

fn email_taken() -> FeedError {
    FeedError::AlreadyExists("An account with this email already exists".into())
}

fn bump_version(tx: &Transaction<'_>, post_id: &str) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE posts SET version = version + 1 WHERE id = ?1",
        params![post_id],
    )?;
    Ok(())
}

impl<'c> SqliteFeed<'c> {
    pub fn new(conn: &'c mut Connection, limits: FeedLimits) -> Self {
        Self { conn, limits }
    }

    // --- Users ---

    /// Insert unless the email is taken. Reports whether a row was written.
    fn insert_user(&self, user: &User, password_hash: Option<&str>) -> rusqlite::Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, email, pseudonym, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(email) DO NOTHING",
            params![
                user.id,
                user.email,
                user.pseudonym,
                password_hash,
                format_ts(&user.created_at)
            ],
        )?;
        Ok(inserted == 1)
    }

    fn new_account(email: &str) -> FeedResult<User> {
        if normalize_email(email).is_empty() {
            return Err(FeedError::Validation("Email is required".into()));
        }
        Ok(User::new(email))
    }

    /// Create an account without a password. It cannot log in until one is set.
    pub fn create_user(&mut self, email: &str) -> FeedResult<User> {
        let user = Self::new_account(email)?;
        if !self.insert_user(&user, None)? {
            return Err(email_taken());
        }
        tracing::info!(user_id = %user.id, pseudonym = %user.pseudonym, "account created");
        Ok(user)
    }

    /// Create an account with a bcrypt password hash.
    pub fn register_user(&mut self, email: &str, password_hash: &str) -> FeedResult<User> {
        let user = Self::new_account(email)?;
        if !self.insert_user(&user, Some(password_hash))? {
            return Err(email_taken());
        }
        tracing::info!(user_id = %user.id, pseudonym = %user.pseudonym, "account registered");
        Ok(user)
    }

    /// Look up an account by email, creating it (with a fresh pseudonym)
    /// if missing. The flag reports whether it was created.
    pub fn find_or_create_user(&mut self, email: &str) -> FeedResult<(User, bool)> {
        let user = Self::new_account(email)?;
        if self.insert_user(&user, None)? {
            tracing::info!(user_id = %user.id, pseudonym = %user.pseudonym, "account created");
            return Ok((user, true));
        }
        self.find_user_by_email(&user.email)?
            .map(|existing| (existing, false))
            .ok_or_else(|| FeedError::user_not_found(&user.email))
    }

    pub fn find_user_by_email(&self, email: &str) -> FeedResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, pseudonym, email, created_at FROM users WHERE email = ?1",
                params![normalize_email(email)],
                user_from_row,
            )
            .optional()?)
    }

    /// The account for `email` with its stored password hash, if any.
    pub fn credentials(&self, email: &str) -> FeedResult<Option<(User, Option<String>)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, pseudonym, email, created_at, password_hash FROM users WHERE email = ?1",
                params![normalize_email(email)],
                |row| Ok((user_from_row(row)?, row.get(4)?)),
            )
            .optional()?)
    }

    pub fn get_user(&self, user_id: &str) -> FeedResult<User> {
        self.conn
            .query_row(
                "SELECT id, pseudonym, email, created_at FROM users WHERE id = ?1",
                params![user_id],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| FeedError::user_not_found(user_id))
    }

    // --- Posts ---

    pub fn create_post(&mut self, author: &User, draft: NewPost) -> FeedResult<Post> {
        self.create_post_at(author, draft, Utc::now())
    }

    /// Like [`SqliteFeed::create_post`] with an explicit creation time.
    pub fn create_post_at(
        &mut self,
        author: &User,
        draft: NewPost,
        created_at: DateTime<Utc>,
    ) -> FeedResult<Post> {
        let text = validate_text(&draft.text, self.limits.max_post_chars, "Post")?;
        let post_id = uuid::Uuid::now_v7().to_string();

        self.conn.execute(
            "INSERT INTO posts (id, user_id, body, media_url, media_kind, campus, is_community, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                post_id,
                author.id,
                text,
                draft.media.as_ref().map(|m| m.url.as_str()),
                draft.media.as_ref().map(|m| m.kind.as_str()),
                draft.campus.as_str(),
                draft.is_community,
                format_ts(&created_at),
            ],
        )?;
        tracing::debug!(post_id = %post_id, campus = %draft.campus, "post created");

        fetch_post(&*self.conn, &post_id)
    }

    pub fn get_post(&self, post_id: &str) -> FeedResult<Post> {
        fetch_post(&*self.conn, post_id)
    }

    pub fn toggle_reaction(
        &mut self,
        post_id: &str,
        user_id: &str,
        kind: ReactionKind,
        expected_version: Option<u64>,
    ) -> FeedResult<Post> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = fetch_post(&tx, post_id)?;
        check_version(&current, expected_version)?;

        let existing: Option<(String, ReactionKind)> = tx
            .query_row(
                "SELECT id, kind FROM reactions WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
                |row| Ok((row.get(0)?, enum_column(row, 1)?)),
            )
            .optional()?;

        let change = ReactionChange::decide(existing.as_ref().map(|(_, k)| *k), kind);
        match (change, existing) {
            (ReactionChange::Added, _) => {
                tx.execute(
                    "INSERT INTO reactions (id, post_id, user_id, kind, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        uuid::Uuid::now_v7().to_string(),
                        post_id,
                        user_id,
                        kind.as_str(),
                        format_ts(&Utc::now()),
                    ],
                )?;
            }
            (ReactionChange::Replaced { .. }, Some((reaction_id, _))) => {
                tx.execute(
                    "UPDATE reactions SET kind = ?1 WHERE id = ?2",
                    params![kind.as_str(), reaction_id],
                )?;
            }
            (ReactionChange::Removed, Some((reaction_id, _))) => {
                tx.execute("DELETE FROM reactions WHERE id = ?1", params![reaction_id])?;
            }
            (_, None) => {}
        }

        bump_version(&tx, post_id)?;
        let post = fetch_post(&tx, post_id)?;
        tx.commit()?;

        tracing::debug!(post_id, user_id, ?change, "reaction toggled");
        Ok(post)
    }

    pub fn add_comment(
        &mut self,
        post_id: &str,
        author: &User,
        text: &str,
        expected_version: Option<u64>,
    ) -> FeedResult<Post> {
        self.add_comment_at(post_id, author, text, expected_version, Utc::now())
    }

    /// Like [`SqliteFeed::add_comment`] with an explicit creation time.
    pub fn add_comment_at(
        &mut self,
        post_id: &str,
        author: &User,
        text: &str,
        expected_version: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> FeedResult<Post> {
        let text = validate_text(text, self.limits.max_comment_chars, "Comment")?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = fetch_post(&tx, post_id)?;
        check_version(&current, expected_version)?;

        tx.execute(
            "INSERT INTO comments (id, post_id, user_id, author_name, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::now_v7().to_string(),
                post_id,
                author.id,
                author.pseudonym,
                text,
                format_ts(&created_at),
            ],
        )?;
        bump_version(&tx, post_id)?;
        let post = fetch_post(&tx, post_id)?;
        tx.commit()?;
        Ok(post)
    }

    /// Owner-only hard delete. Reactions and comments go in the same
    /// transaction.
    pub fn delete_post(&mut self, post_id: &str, requester_id: &str) -> FeedResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owner: String = tx
            .query_row(
                "SELECT user_id FROM posts WHERE id = ?1",
                params![post_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| FeedError::post_not_found(post_id))?;

        if owner != requester_id {
            tracing::warn!(post_id, requester_id, "delete rejected for non-owner");
            return Err(FeedError::Forbidden(
                "Only the author can delete this post".into(),
            ));
        }

        tx.execute("DELETE FROM reactions WHERE post_id = ?1", params![post_id])?;
        tx.execute("DELETE FROM comments WHERE post_id = ?1", params![post_id])?;
        tx.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
        tx.commit()?;
        Ok(())
    }

    /// The filtered view over stored posts. Section and campus narrow the
    /// SQL query; the search and the final ordering are the engine's own.
    pub fn list(&self, query: &FeedQuery) -> FeedResult<Vec<Post>> {
        let is_community = query.section == Section::Communities;
        let posts = match query.campus {
            Some(campus) => fetch_posts(
                &*self.conn,
                "p.is_community = ?1 AND p.campus = ?2",
                params![is_community, campus.as_str()],
            )?,
            None => fetch_posts(&*self.conn, "p.is_community = ?1", params![is_community])?,
        };
        Ok(filtered_view(&posts, query).to_vec())
    }

    pub fn posts_by_author(&self, user_id: &str) -> FeedResult<Vec<Post>> {
        fetch_posts(&*self.conn, "p.user_id = ?1", params![user_id])
    }

    pub fn post_count(&self) -> FeedResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?)
    }
}
