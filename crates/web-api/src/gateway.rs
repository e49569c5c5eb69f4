//! WebSocket 网关
//!
//! 连接生命周期：Connecting → Authenticated → Disconnected。
//! 握手时验证访问令牌，失败则向该连接发一条 exception 并强制关闭，
//! 永远不会进入 Authenticated。认证成功后登记连接并把当前房间列表
//! 推给这一条连接。断开时只做注销，没有其他副作用。
//!
//! 每个入站事件独立处理：认证（连接期身份）→ 授权（参与者校验）
//! → 变更 → 扇出广播 → 需要时给发起方一个定向回执。处理器各自
//! 捕获自己的失败，对外只回粗粒度的 exception。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use application::services::{CreateRoomRequest, MessageQuery, UpdateRoomRequest, DEFAULT_PAGE_SIZE};
use application::token::TokenClaims;
use application::{ApplicationError, ServerEvent, UserDto};
use domain::{ConnectionId, UserId};

use crate::auth::bearer_token;
use crate::protocol::{
    ClientEvent, CreateRoomPayload, DeleteMessagePayload, DeleteRoomPayload,
    FilterMessagesPayload, RoomFetchPayload, SendMessagePayload, UpdateMessagePayload,
    UpdateRoomPayload,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Authorization 头缺席时的备用令牌位置
    pub token: Option<String>,
}

pub async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Response {
    let auth = authenticate_handshake(&state, &headers, &query);
    ws.on_upgrade(move |socket| handle_socket(socket, auth, state))
}

fn authenticate_handshake(
    state: &AppState,
    headers: &HeaderMap,
    query: &WsQuery,
) -> Result<TokenClaims, ApplicationError> {
    let token = match bearer_token(headers) {
        Ok(token) => token.to_owned(),
        Err(_) => query
            .token
            .clone()
            .ok_or(ApplicationError::Authentication)?,
    };
    state.auth_service.verify_access_token(&token)
}

async fn handle_socket(
    socket: WebSocket,
    auth: Result<TokenClaims, ApplicationError>,
    state: AppState,
) {
    let (mut sender, mut receiver) = socket.split();

    let claims = match auth {
        Ok(claims) => claims,
        Err(err) => {
            // 认证失败：发出错误事件并强制关闭，连接不会被登记
            warn!(error = %err, "websocket handshake rejected");
            if let Ok(payload) = serde_json::to_string(&ServerEvent::exception("Authentication error"))
            {
                let _ = sender.send(WsMessage::Text(payload.into())).await;
            }
            let _ = sender.close().await;
            return;
        }
    };

    let user_id = claims.sub;
    let connection_id = ConnectionId::new(Uuid::new_v4().to_string())
        .expect("generated connection id is never empty");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.hub.register_sender(connection_id.clone(), tx).await;

    if let Err(err) = state
        .registry
        .register(UserId::from(user_id), connection_id.clone())
        .await
    {
        error!(user_id = %user_id, error = %err, "failed to register connection");
        state.hub.unregister_sender(&connection_id).await;
        let _ = sender.close().await;
        return;
    }

    info!(connection_id = %connection_id, user_id = %user_id, "client connected");

    // 房间列表只推给刚建立的这一条连接
    match state.room_service.find_for_user(user_id).await {
        Ok(rooms) => {
            state
                .notifier
                .send_to_connection(&connection_id, &ServerEvent::UserAllRooms(rooms))
                .await;
        }
        Err(err) => {
            error!(user_id = %user_id, error = %err, "failed to load rooms on connect");
            state
                .notifier
                .send_to_connection(
                    &connection_id,
                    &ServerEvent::exception("Error occurred while retrieving user rooms."),
                )
                .await;
        }
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(payload) => {
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_event(&state, &claims, &connection_id, text.to_string()).await;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Binary(_))) => {
                        debug!(connection_id = %connection_id, "binary frames are not part of the protocol");
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(connection_id = %connection_id, error = %err, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    // 断开：注销连接，无其他副作用
    state.hub.unregister_sender(&connection_id).await;
    if let Err(err) = state.registry.unregister(&connection_id).await {
        error!(connection_id = %connection_id, error = %err, "failed to unregister connection");
    }
    info!(connection_id = %connection_id, user_id = %user_id, "client disconnected");
}

async fn handle_client_event(
    state: &AppState,
    claims: &TokenClaims,
    connection_id: &ConnectionId,
    raw: String,
) {
    let event: ClientEvent = match serde_json::from_str(&raw) {
        Ok(event) => event,
        Err(err) => {
            warn!(connection_id = %connection_id, error = %err, "unparseable client event");
            state
                .notifier
                .send_to_connection(
                    connection_id,
                    &ServerEvent::exception("Unrecognized or malformed event."),
                )
                .await;
            return;
        }
    };

    if let Err(err) = event.validate_payload() {
        warn!(
            connection_id = %connection_id,
            event = event.name(),
            error = %err,
            "client event failed validation"
        );
        state
            .notifier
            .send_to_connection(connection_id, &ServerEvent::exception("Invalid event payload."))
            .await;
        return;
    }

    let user_id = claims.sub;
    let event_name = event.name();
    let outcome = match event {
        ClientEvent::CreateRoom(payload) => on_create_room(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while creating the room.", err)),
        ClientEvent::GetRoomDetails(payload) => {
            on_get_room_details(state, user_id, connection_id, payload)
                .await
                .map_err(|err| ("Error occurred while fetching room details.", err))
        }
        ClientEvent::UpdateRoom(payload) => on_update_room(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while updating room details.", err)),
        ClientEvent::DeleteRoom(payload) => on_delete_room(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while deleting the room.", err)),
        ClientEvent::SendMessage(payload) => on_send_message(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while sending the message.", err)),
        ClientEvent::FindAllMessages(payload) => {
            on_find_all_messages(state, user_id, connection_id, payload)
                .await
                .map_err(|err| ("Error occurred while fetching messages.", err))
        }
        ClientEvent::UpdateMessage(payload) => on_update_message(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while updating the message.", err)),
        ClientEvent::DeleteMessage(payload) => on_delete_message(state, user_id, payload)
            .await
            .map_err(|err| ("Error occurred while deleting messages.", err)),
    };

    if let Err((public_message, err)) = outcome {
        error!(
            user_id = %user_id,
            connection_id = %connection_id,
            event = event_name,
            error = %err,
            "event handling failed"
        );
        state
            .notifier
            .send_to_connection(connection_id, &ServerEvent::exception(public_message))
            .await;
    }
}

async fn on_create_room(
    state: &AppState,
    user_id: Uuid,
    payload: CreateRoomPayload,
) -> Result<(), ApplicationError> {
    let room = state
        .room_service
        .create_room(CreateRoomRequest {
            owner_id: user_id,
            room_type: payload.room_type,
            name: payload.name,
            participant_ids: payload.participants,
        })
        .await?;

    let detailed = state
        .room_service
        .get_detailed(user_id, room.id.into())
        .await?;
    let participants = detailed.participants.clone();
    state
        .notifier
        .notify(&participants, &ServerEvent::RoomCreated(detailed))
        .await;

    info!(room_id = %room.id, user_id = %user_id, "room created and participants notified");
    Ok(())
}

async fn on_get_room_details(
    state: &AppState,
    user_id: Uuid,
    connection_id: &ConnectionId,
    payload: RoomFetchPayload,
) -> Result<(), ApplicationError> {
    let detailed = state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    // 查询类事件只回给发起方
    state
        .notifier
        .send_to_connection(connection_id, &ServerEvent::RoomDetailsFetched(detailed))
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "room details fetched");
    Ok(())
}

async fn on_update_room(
    state: &AppState,
    user_id: Uuid,
    payload: UpdateRoomPayload,
) -> Result<(), ApplicationError> {
    // 先做参与者授权，再动任何数据
    state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    state
        .room_service
        .update_room(UpdateRoomRequest {
            actor_id: user_id,
            room_id: payload.room_id,
            name: payload.name,
            participant_ids: payload.participants,
        })
        .await?;

    let detailed = state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;
    let participants = detailed.participants.clone();
    state
        .notifier
        .notify(&participants, &ServerEvent::RoomUpdated(detailed))
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "room updated and participants notified");
    Ok(())
}

async fn on_delete_room(
    state: &AppState,
    user_id: Uuid,
    payload: DeleteRoomPayload,
) -> Result<(), ApplicationError> {
    let detailed = state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    state.room_service.delete_room(payload.room_id).await?;

    // 操作者自己不需要通知
    let recipients: Vec<UserDto> = detailed
        .participants
        .into_iter()
        .filter(|participant| participant.id != user_id)
        .collect();
    state
        .notifier
        .notify(&recipients, &ServerEvent::room_deleted(payload.room_id))
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "room deleted");
    Ok(())
}

async fn on_send_message(
    state: &AppState,
    user_id: Uuid,
    payload: SendMessagePayload,
) -> Result<(), ApplicationError> {
    // 参与者校验先行：非成员连消息都建不了
    let detailed = state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    let page = state
        .message_service
        .create(user_id, payload.room_id, payload.text)
        .await?;

    state
        .notifier
        .notify(&detailed.participants, &ServerEvent::MessageSent(page))
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "message sent and participants notified");
    Ok(())
}

async fn on_find_all_messages(
    state: &AppState,
    user_id: Uuid,
    connection_id: &ConnectionId,
    payload: FilterMessagesPayload,
) -> Result<(), ApplicationError> {
    state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    let page = state
        .message_service
        .find_by_room(MessageQuery {
            room_id: payload.room_id,
            offset: payload.first.unwrap_or(0),
            limit: payload.rows.unwrap_or(DEFAULT_PAGE_SIZE),
            filter: payload.filter.unwrap_or_default(),
        })
        .await?;

    state
        .notifier
        .send_to_connection(connection_id, &ServerEvent::AllMessages(page))
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "messages fetched");
    Ok(())
}

async fn on_update_message(
    state: &AppState,
    user_id: Uuid,
    payload: UpdateMessagePayload,
) -> Result<(), ApplicationError> {
    let updated = state
        .message_service
        .update(user_id, payload.message_id, payload.text)
        .await?;
    let room_id = Uuid::from(updated.room_id);

    let detailed = state.room_service.get_detailed(user_id, room_id).await?;
    let page = state
        .message_service
        .find_by_room(MessageQuery::first_page(room_id))
        .await?;

    state
        .notifier
        .notify(&detailed.participants, &ServerEvent::MessageUpdated(page))
        .await;

    info!(message_id = %payload.message_id, user_id = %user_id, "message updated and participants notified");
    Ok(())
}

async fn on_delete_message(
    state: &AppState,
    user_id: Uuid,
    payload: DeleteMessagePayload,
) -> Result<(), ApplicationError> {
    let detailed = state
        .room_service
        .get_detailed(user_id, payload.room_id)
        .await?;

    state
        .message_service
        .delete(user_id, payload.room_id, &payload.message_ids)
        .await?;

    state
        .notifier
        .notify(
            &detailed.participants,
            &ServerEvent::MessageDeleted(application::events::MessagesDeletedNotice {
                message_ids: payload.message_ids,
            }),
        )
        .await;

    info!(room_id = %payload.room_id, user_id = %user_id, "messages deleted and participants notified");
    Ok(())
}
