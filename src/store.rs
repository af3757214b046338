use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::db::Db;
use crate::errors::ApiError;
use crate::models::message::{Message, MessageWithAuthor};
use crate::models::room::Room;
use crate::models::user::User;

pub const ROOM_NAME_MAX: usize = 100;

/// Every query the handlers need, plus the data-entry operations the admin
/// path uses. Handlers never touch SQL directly.
#[derive(Clone)]
pub struct ChatStore {
    db: Db,
}

impl ChatStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        let rows = sqlx::query("SELECT id, name, slug FROM rooms")
            .fetch_all(&self.db.0)
            .await?;
        Ok(rows.into_iter().map(|r| room_from_row(&r)).collect())
    }

    pub async fn find_room_by_slug(&self, slug: &str) -> Result<Option<Room>, ApiError> {
        let row = sqlx::query("SELECT id, name, slug FROM rooms WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.db.0)
            .await?;
        Ok(row.map(|r| room_from_row(&r)))
    }

    // Ascending by date; the limit keeps the earliest rows.
    pub async fn list_messages(
        &self,
        room_id: &str,
        limit: i64,
    ) -> Result<Vec<MessageWithAuthor>, ApiError> {
        let rows = sqlx::query(
            "SELECT m.id, u.username, m.message_content, m.date
             FROM messages m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.room_id = ?
             ORDER BY m.date ASC LIMIT ?",
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.db.0)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| MessageWithAuthor {
                id: r.get("id"),
                username: r.get("username"),
                message_content: r.get("message_content"),
                date: r.get("date"),
            })
            .collect())
    }

    pub async fn create_user(&self, username: &str) -> Result<User, ApiError> {
        if username.trim().is_empty() {
            return Err(ApiError::BadRequest("username required".into()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO users(id, username) VALUES (?, ?)")
            .bind(&id)
            .bind(username)
            .execute(&self.db.0)
            .await
            .map_err(|e| conflict_or_internal(e, "username already taken"))?;
        Ok(User {
            id,
            username: username.to_string(),
        })
    }

    pub async fn create_room(&self, name: &str, slug: &str) -> Result<Room, ApiError> {
        if name.trim().is_empty() || name.chars().count() > ROOM_NAME_MAX {
            return Err(ApiError::BadRequest(format!(
                "name must be 1 to {} characters",
                ROOM_NAME_MAX
            )));
        }
        if !is_valid_slug(slug) {
            return Err(ApiError::BadRequest(
                "slug may only contain a-z, 0-9, '-' and '_'".into(),
            ));
        }
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO rooms(id, name, slug) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(slug)
            .execute(&self.db.0)
            .await
            .map_err(|e| conflict_or_internal(e, "slug already in use"))?;
        Ok(Room {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    pub async fn post_message(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        self.post_message_at(room_id, user_id, content, Utc::now())
            .await
    }

    pub async fn post_message_at(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
        date: DateTime<Utc>,
    ) -> Result<Message, ApiError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO messages(id, user_id, room_id, message_content, date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(room_id)
        .bind(content)
        .bind(date)
        .execute(&self.db.0)
        .await?;
        Ok(Message {
            id,
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            message_content: content.to_string(),
            date,
        })
    }

    /// Removes the user and every message they authored in one transaction.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        let mut tx = self.db.0.begin().await?;
        sqlx::query("DELETE FROM messages WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    /// Removes the room and its messages in one transaction.
    pub async fn delete_room(&self, room_id: &str) -> Result<(), ApiError> {
        let mut tx = self.db.0.begin().await?;
        sqlx::query("DELETE FROM messages WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        if res.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

fn conflict_or_internal(e: sqlx::Error, msg: &str) -> ApiError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => ApiError::Conflict(msg.into()),
        _ => ApiError::from(e),
    }
}

fn room_from_row(r: &sqlx::sqlite::SqliteRow) -> Room {
    Room {
        id: r.get("id"),
        name: r.get("name"),
        slug: r.get("slug"),
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> ChatStore {
        let db = Db::connect_in_memory().await.expect("in-memory db");
        ChatStore::new(db)
    }

    #[tokio::test]
    async fn lists_all_created_rooms() {
        let store = test_store().await;
        store.create_room("General", "general").await.unwrap();
        store.create_room("Random", "random").await.unwrap();
        store.create_room("Rust Help", "rust-help").await.unwrap();

        let mut slugs: Vec<String> = store
            .list_rooms()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.slug)
            .collect();
        slugs.sort();
        assert_eq!(slugs, vec!["general", "random", "rust-help"]);
    }

    #[tokio::test]
    async fn empty_listing_is_not_an_error() {
        let store = test_store().await;
        assert!(store.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finds_room_by_slug() {
        let store = test_store().await;
        store.create_room("General", "general").await.unwrap();
        store.create_room("Random", "random").await.unwrap();

        let room = store.find_room_by_slug("general").await.unwrap().unwrap();
        assert_eq!(room.name, "General");
        assert_eq!(room.slug, "general");
    }

    #[tokio::test]
    async fn unknown_slug_is_none() {
        let store = test_store().await;
        store.create_room("General", "general").await.unwrap();
        assert!(store
            .find_room_by_slug("does-not-exist")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let store = test_store().await;
        store.create_room("General", "general").await.unwrap();
        let err = store.create_room("General Two", "general").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejects_overlong_name_and_bad_slug() {
        let store = test_store().await;
        let long_name = "x".repeat(ROOM_NAME_MAX + 1);
        assert!(matches!(
            store.create_room(&long_name, "ok").await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            store.create_room("Ok", "No Spaces!").await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            store.create_room("Ok", "").await.unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn message_listing_keeps_the_oldest_in_ascending_order() {
        let store = test_store().await;
        let user = store.create_user("alice").await.unwrap();
        let room = store.create_room("General", "general").await.unwrap();

        for i in 0..45 {
            let date = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, i).unwrap();
            store
                .post_message_at(&room.id, &user.id, &format!("msg {}", i), date)
                .await
                .unwrap();
        }

        let msgs = store.list_messages(&room.id, 30).await.unwrap();
        assert_eq!(msgs.len(), 30);
        for (i, m) in msgs.iter().enumerate() {
            assert_eq!(m.message_content, format!("msg {}", i));
        }
        assert!(msgs.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn empty_room_lists_no_messages() {
        let store = test_store().await;
        let room = store.create_room("General", "general").await.unwrap();
        assert!(store.list_messages(&room.id, 30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_messages() {
        let store = test_store().await;
        let alice = store.create_user("alice").await.unwrap();
        let bob = store.create_user("bob").await.unwrap();
        assert_eq!(alice.username, "alice");
        let room = store.create_room("General", "general").await.unwrap();

        let first = store.post_message(&room.id, &alice.id, "hi").await.unwrap();
        assert_eq!(first.room_id, room.id);
        assert_eq!(first.user_id, alice.id);
        assert_eq!(first.message_content, "hi");
        store.post_message(&room.id, &bob.id, "hello").await.unwrap();
        store.post_message(&room.id, &alice.id, "bye").await.unwrap();

        store.delete_user(&alice.id).await.unwrap();

        let msgs = store.list_messages(&room.id, 30).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].username, "bob");
    }

    #[tokio::test]
    async fn deleting_a_room_removes_its_messages() {
        let store = test_store().await;
        let alice = store.create_user("alice").await.unwrap();
        let general = store.create_room("General", "general").await.unwrap();
        let random = store.create_room("Random", "random").await.unwrap();

        store.post_message(&general.id, &alice.id, "hi").await.unwrap();
        store.post_message(&random.id, &alice.id, "yo").await.unwrap();

        store.delete_room(&general.id).await.unwrap();

        assert!(store.find_room_by_slug("general").await.unwrap().is_none());
        assert!(store.list_messages(&general.id, 30).await.unwrap().is_empty());
        assert_eq!(store.list_messages(&random.id, 30).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_unknown_user_is_not_found() {
        let store = test_store().await;
        assert!(matches!(
            store.delete_user("nope").await.unwrap_err(),
            ApiError::NotFound
        ));
    }
}
