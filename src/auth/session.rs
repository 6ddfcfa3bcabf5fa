use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::feed::user_from_row;
use crate::feed::User;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// The user behind an unexpired session token.
pub fn session_user(conn: &Connection, token: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT u.id, u.pseudonym, u.email, u.created_at FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        user_from_row,
    )
    .optional()
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteFeed;
    use crate::feed::FeedLimits;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for (_, sql) in crate::db::MIGRATIONS {
            conn.execute_batch(sql).unwrap();
        }
        conn
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
    }

    #[test]
    fn session_resolves_to_user_until_deleted() {
        let mut conn = setup();
        let user = SqliteFeed::new(&mut conn, FeedLimits::default())
            .create_user("a@vit.ac.in")
            .unwrap();

        let token = create_session(&conn, &user.id, 1).unwrap();
        let found = session_user(&conn, &token).unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.pseudonym, user.pseudonym);

        delete_session(&conn, &token).unwrap();
        assert!(session_user(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored() {
        let mut conn = setup();
        let user = SqliteFeed::new(&mut conn, FeedLimits::default())
            .create_user("a@vit.ac.in")
            .unwrap();
        let token = create_session(&conn, &user.id, 0).unwrap();
        assert!(session_user(&conn, &token).unwrap().is_none());
    }
}
