use crate::{errors::ApiError, store::ChatStore};
use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::models::message::MessageWithAuthor;
use crate::models::room::Room;

// How many messages the room view shows. The ascending query means the cut
// keeps the oldest rows.
const ROOM_VIEW_MESSAGE_LIMIT: i64 = 30;

pub async fn list_rooms(store: web::Data<ChatStore>) -> Result<HttpResponse, ApiError> {
    let rooms = store.list_rooms().await?;
    Ok(HttpResponse::Ok().json(rooms))
}

#[derive(Serialize)]
struct RoomDetailResp {
    room: Room,
    messages: Vec<MessageWithAuthor>,
}

pub async fn room_detail(
    store: web::Data<ChatStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let room = store
        .find_room_by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    let messages = store
        .list_messages(&room.id, ROOM_VIEW_MESSAGE_LIMIT)
        .await?;
    Ok(HttpResponse::Ok().json(RoomDetailResp { room, messages }))
}
