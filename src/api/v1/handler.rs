use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

const DEFAULT_PAGE_SIZE: u16 = 20;
const MAX_PAGE_SIZE: u16 = 100;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn page_size(requested: Option<u16>) -> PageSize {
    PageSize(requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE))
}

fn parse_cursor(raw: Option<&str>) -> Result<Option<Cursor>, warp::Rejection> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<Cursor>()
            .map(Some)
            .map_err(|e| ApiFault::reject(ApiErrorCode::BadCursor, e)),
    }
}

fn faulted(error: CoordError) -> warp::Rejection {
    reject::custom(ApiFault::from(error))
}

// region conversations

#[derive(Debug, Deserialize)]
pub struct CreateDirectRequest {
    pub other_user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct CreateDirectResponse {
    pub conversation_id: ConversationId,
}

pub async fn create_direct(
    body: CreateDirectRequest,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let conversation_id = conversation_service
        .create_direct(caller, body.other_user_id)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(CreateDirectResponse {
        conversation_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub kind: ConversationKind,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

pub async fn create_group(
    body: CreateGroupRequest,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let conversation = conversation_service
        .create_group(caller, &body.name, body.kind, body.member_ids)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(conversation)))
}

#[derive(Debug, Deserialize)]
pub struct ConversationListQuery {
    pub page_size: Option<u16>,
    pub cursor: Option<String>,
    pub kind: Option<ConversationKind>,
    pub keyword: Option<String>,
}

pub async fn list_conversations(
    query: ConversationListQuery,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let filter = ConversationFilter {
        kind: query.kind,
        keyword: query.keyword,
    };

    let page = conversation_service
        .list_conversations(caller, page_size(query.page_size), cursor, filter)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

pub async fn remove_member(
    conversation_id: ConversationId,
    target: UserId,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    conversation_service
        .remove_member(conversation_id, caller, target)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

pub async fn leave_conversation(
    conversation_id: ConversationId,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    conversation_service
        .leave_conversation(conversation_id, caller)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

pub async fn dissolve_conversation(
    conversation_id: ConversationId,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    conversation_service
        .dissolve(conversation_id, caller)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

#[derive(Debug, Deserialize)]
pub struct AvatarUploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

pub async fn request_avatar_upload(
    conversation_id: ConversationId,
    body: AvatarUploadRequest,
    caller: UserId,
    conversation_service: Arc<dyn ConversationService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let handle = conversation_service
        .request_avatar_upload(
            conversation_id,
            caller,
            &body.file_name,
            &body.content_type,
            body.size_bytes,
        )
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(handle)))
}

// endregion

// region invites

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub conversation_id: ConversationId,
    pub receiver_id: UserId,
    pub note: Option<String>,
}

pub async fn create_invite(
    body: CreateInviteRequest,
    caller: UserId,
    invite_service: Arc<dyn InviteService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let invite = invite_service
        .create_invite(body.conversation_id, caller, body.receiver_id, body.note)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(invite)))
}

#[derive(Debug, Deserialize)]
pub struct RespondInviteRequest {
    pub decision: InviteDecision,
}

pub async fn respond_to_invite(
    invite_id: InviteId,
    body: RespondInviteRequest,
    caller: UserId,
    invite_service: Arc<dyn InviteService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let invite = invite_service
        .respond_to_invite(invite_id, caller, body.decision)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(invite)))
}

#[derive(Debug, Deserialize)]
pub struct InviteListQuery {
    pub page_size: Option<u16>,
    pub cursor: Option<String>,
    pub status: Option<InviteStatus>,
    pub keyword: Option<String>,
}

pub async fn list_invites(
    query: InviteListQuery,
    caller: UserId,
    invite_service: Arc<dyn InviteService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let filter = InviteFilter {
        status: query.status,
        keyword: query.keyword,
    };

    let page = invite_service
        .list_invites(caller, page_size(query.page_size), cursor, filter)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

// endregion

// region messages

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

pub async fn send_message(
    conversation_id: ConversationId,
    body: SendMessageRequest,
    caller: UserId,
    message_service: Arc<dyn MessageService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let message = message_service
        .send_message(conversation_id, caller, &body.content)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(message)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page_size: Option<u16>,
    pub cursor: Option<String>,
}

pub async fn get_history(
    conversation_id: ConversationId,
    query: HistoryQuery,
    caller: UserId,
    message_service: Arc<dyn MessageService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let cursor = parse_cursor(query.cursor.as_deref())?;

    let page = message_service
        .get_history(caller, conversation_id, page_size(query.page_size), cursor)
        .await
        .map_err(faulted)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

// endregion
