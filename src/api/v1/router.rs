use super::error::*;
use super::handler;
use crate::api::v1::handler::{ConversationListQuery, HistoryQuery, InviteListQuery};
use crate::domain_model::{ConversationId, InviteId, UserId};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let create_direct = warp::post()
        .and(warp::path!("conversations" / "direct"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::create_direct);

    let create_group = warp::post()
        .and(warp::path!("conversations"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::create_group);

    let list_conversations = warp::get()
        .and(warp::path!("conversations"))
        .and(warp::query::<ConversationListQuery>())
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::list_conversations);

    let remove_member = warp::delete()
        .and(warp::path!("conversations" / ConversationId / "members" / UserId))
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::remove_member);

    let leave = warp::post()
        .and(warp::path!("conversations" / ConversationId / "leave"))
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::leave_conversation);

    let dissolve = warp::delete()
        .and(warp::path!("conversations" / ConversationId))
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::dissolve_conversation);

    let avatar_upload = warp::post()
        .and(warp::path!("conversations" / ConversationId / "avatar_upload"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.conversation_service.clone()))
        .and_then(handler::request_avatar_upload);

    let create_invite = warp::post()
        .and(warp::path!("invites"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.invite_service.clone()))
        .and_then(handler::create_invite);

    let respond_invite = warp::post()
        .and(warp::path!("invites" / InviteId / "response"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.invite_service.clone()))
        .and_then(handler::respond_to_invite);

    let list_invites = warp::get()
        .and(warp::path!("invites"))
        .and(warp::query::<InviteListQuery>())
        .and(with_caller())
        .and(with(server.invite_service.clone()))
        .and_then(handler::list_invites);

    let send_message = warp::post()
        .and(warp::path!("conversations" / ConversationId / "messages"))
        .and(warp::body::json())
        .and(with_caller())
        .and(with(server.message_service.clone()))
        .and_then(handler::send_message);

    let history = warp::get()
        .and(warp::path!("conversations" / ConversationId / "messages"))
        .and(warp::query::<HistoryQuery>())
        .and(with_caller())
        .and(with(server.message_service.clone()))
        .and_then(handler::get_history);

    create_direct
        .or(create_group)
        .or(list_conversations)
        .or(remove_member)
        .or(leave)
        .or(dissolve)
        .or(avatar_upload)
        .or(create_invite)
        .or(respond_invite)
        .or(list_invites)
        .or(send_message)
        .or(history)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Caller identity arrives pre-verified from the gateway in `X-User-Id`.
fn with_caller() -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>("x-user-id").and_then(|raw: String| async move {
        raw.parse::<UserId>().map_err(|_| {
            ApiFault::reject(ApiErrorCode::Forbidden, "missing or invalid caller identity")
        })
    })
}
