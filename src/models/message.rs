use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub message_content: String,
    pub date: DateTime<Utc>,
}

/// Message joined with its author's username, as the room view renders it.
#[derive(Serialize, Debug, Clone)]
pub struct MessageWithAuthor {
    pub id: String,
    pub username: String,
    pub message_content: String,
    pub date: DateTime<Utc>,
}
