use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::core::error::AppResult;
use crate::dispatch::ports::{Question, Role, User};
use crate::dispatch::update::Sender;
use crate::storage::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections and brings the schema up to date.
/// Unlike a missing table later on, a failed migration stops startup.
///
/// # Example
///
/// ```no_run
/// use question_bot::storage::db;
///
/// let pool = db::create_pool("questions.sqlite")?;
/// # Ok::<(), question_bot::core::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

fn user_from_row(row: &Row<'_>) -> Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: Role::from_stored(&role),
    })
}

/// Inserts the user with the default role, or refreshes their names.
///
/// The stored role is never touched here.
pub fn create_user_if_absent(conn: &Connection, user: &Sender) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, first_name, last_name) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            first_name = excluded.first_name,
            last_name = excluded.last_name",
        params![user.id, user.username, user.first_name, user.last_name],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, first_name, last_name, role FROM users WHERE id = ?1",
        [user_id],
        user_from_row,
    )
    .optional()
}

/// Updates the role of the user with this username.
///
/// Matching ignores case and a leading `@`. Returns the number of updated rows.
pub fn set_role_by_username(conn: &Connection, role: Role, username: &str) -> Result<usize> {
    let username = username.trim().trim_start_matches('@');
    conn.execute(
        "UPDATE users SET role = ?1 WHERE lower(username) = lower(?2)",
        params![role.to_string(), username],
    )
}

pub fn users_by_role(conn: &Connection, role: Role) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, username, first_name, last_name, role FROM users WHERE role = ?1 ORDER BY id")?;
    let rows = stmt.query_map([role.to_string()], user_from_row)?;
    rows.collect()
}

/// Stores a question and returns its id
pub fn insert_question(conn: &Connection, user_id: i64, text: &str) -> Result<i64> {
    conn.execute("INSERT INTO question (user_id, question) VALUES (?1, ?2)", params![user_id, text])?;
    Ok(conn.last_insert_rowid())
}

pub fn all_questions(conn: &Connection) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare("SELECT id, user_id, question FROM question ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Question {
            id: row.get(0)?,
            user_id: row.get(1)?,
            text: row.get(2)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&mut conn).unwrap();
        conn
    }

    fn sender(id: i64, username: Option<&str>, first_name: &str) -> Sender {
        Sender {
            id,
            username: username.map(str::to_string),
            first_name: first_name.to_string(),
            last_name: None,
        }
    }

    #[test]
    fn test_new_user_gets_default_role() {
        let conn = conn();
        create_user_if_absent(&conn, &sender(7, Some("alice"), "Alice")).unwrap();

        let user = get_user(&conn, 7).unwrap().unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert!(get_user(&conn, 8).unwrap().is_none());
    }

    #[test]
    fn test_repeat_registration_refreshes_names_keeps_role() {
        let conn = conn();
        create_user_if_absent(&conn, &sender(7, Some("alice"), "Alice")).unwrap();
        set_role_by_username(&conn, Role::Admin, "alice").unwrap();

        create_user_if_absent(&conn, &sender(7, Some("alice_new"), "Alicia")).unwrap();

        let user = get_user(&conn, 7).unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.username.as_deref(), Some("alice_new"));
        assert_eq!(user.first_name, "Alicia");
    }

    #[test]
    fn test_role_update_matches_username_loosely() {
        let conn = conn();
        create_user_if_absent(&conn, &sender(7, Some("Bob"), "Bob")).unwrap();

        assert_eq!(set_role_by_username(&conn, Role::Admin, "@bob").unwrap(), 1);
        assert_eq!(set_role_by_username(&conn, Role::Admin, "nobody").unwrap(), 0);
        assert_eq!(users_by_role(&conn, Role::Admin).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_stored_role_reads_as_user() {
        let conn = conn();
        create_user_if_absent(&conn, &sender(7, None, "Eve")).unwrap();
        conn.execute("UPDATE users SET role = 'moderator' WHERE id = 7", []).unwrap();

        assert_eq!(get_user(&conn, 7).unwrap().unwrap().role, Role::User);
    }

    #[test]
    fn test_questions_are_listed_in_insert_order() {
        let conn = conn();
        create_user_if_absent(&conn, &sender(7, None, "Eve")).unwrap();
        let first = insert_question(&conn, 7, "first").unwrap();
        let second = insert_question(&conn, 7, "second").unwrap();

        let rows = all_questions(&conn).unwrap();
        assert!(second > first);
        assert_eq!(
            rows.iter().map(|q| q.text.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
    }
}
