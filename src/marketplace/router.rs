use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::chat::ChatPublisher;
use super::directory::Registration;
use super::domain::{ApplicationId, Caller, ChatRoomId, JobId, Role, UserId};
use super::error::{ErrorKind, MarketplaceError};
use super::jobs::{JobDraft, JobFilter};
use super::repository::MarketplaceRepository;
use super::Marketplace;

/// Header carrying the verified account id of the caller.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the verified role claim of the caller.
pub const USER_ROLE_HEADER: &str = "x-user-role";

type Shared<R, P> = State<Arc<Marketplace<R, P>>>;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Router exposing the marketplace operations.
pub fn marketplace_router<R, P>(marketplace: Arc<Marketplace<R, P>>) -> Router
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    Router::new()
        .route("/api/accounts", post(register_handler::<R, P>))
        .route("/api/jobs", get(search_jobs_handler::<R, P>))
        .route("/api/jobs/applied", get(applied_jobs_handler::<R, P>))
        .route(
            "/api/jobs/:job_id",
            get(job_handler::<R, P>).delete(delete_job_handler::<R, P>),
        )
        .route(
            "/api/provider/jobs",
            get(provider_jobs_handler::<R, P>).post(create_job_handler::<R, P>),
        )
        .route(
            "/api/provider/jobs/:job_id",
            put(update_job_handler::<R, P>),
        )
        .route("/api/jobs/:job_id/apply", post(apply_handler::<R, P>))
        .route(
            "/api/jobs/:job_id/applications",
            get(job_applications_handler::<R, P>),
        )
        .route(
            "/api/jobs/applications/:application_id",
            delete(withdraw_handler::<R, P>),
        )
        .route(
            "/api/jobs/applications/:application_id/accept",
            put(accept_handler::<R, P>),
        )
        .route(
            "/api/jobs/applications/:application_id/reject",
            put(reject_handler::<R, P>),
        )
        .route(
            "/api/jobs/applications/:application_id/hide/seeker",
            put(hide_seeker_handler::<R, P>),
        )
        .route(
            "/api/jobs/applications/:application_id/hide/provider",
            put(hide_provider_handler::<R, P>),
        )
        .route(
            "/api/chat/:room_id/messages",
            get(history_handler::<R, P>).post(send_handler::<R, P>),
        )
        .route("/api/chat/:room_id/unread", get(unread_handler::<R, P>))
        .route("/api/chat/:room_id/read", put(mark_read_handler::<R, P>))
        .route("/api/chat/:room_id/user", get(partner_handler::<R, P>))
        .route(
            "/api/admin/applications",
            get(admin_records_handler::<R, P>),
        )
        .route("/api/admin/seekers", get(seekers_handler::<R, P>))
        .route("/api/admin/providers", get(providers_handler::<R, P>))
        .route(
            "/api/admin/seekers/:user_id",
            delete(delete_seeker_handler::<R, P>),
        )
        .route(
            "/api/admin/providers/:user_id",
            delete(delete_provider_handler::<R, P>),
        )
        .with_state(marketplace)
}

/// Read the caller identity the authentication layer has already verified.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, Response> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok());
    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse);

    match (user_id, role) {
        (Some(user_id), Some(role)) => Ok(Caller::new(UserId(user_id), role)),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or invalid caller identity" })),
        )
            .into_response()),
    }
}

pub(crate) fn error_response(err: MarketplaceError) -> Response {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Duplicate | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if kind == ErrorKind::Internal {
        error!(error = %err, "marketplace operation failed");
        "internal error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(json!({ "error": message, "kind": kind }))).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

macro_rules! caller_or_reject {
    ($headers:expr) => {
        match caller_from_headers(&$headers) {
            Ok(caller) => caller,
            Err(response) => return response,
        }
    };
}

pub(crate) async fn register_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Json(registration): Json<Registration>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    respond(
        StatusCode::CREATED,
        marketplace.directory.register(registration),
    )
}

pub(crate) async fn search_jobs_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Query(filter): Query<JobFilter>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    respond(StatusCode::OK, marketplace.jobs.search_jobs(&filter))
}

pub(crate) async fn job_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(job_id): Path<u64>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    respond(StatusCode::OK, marketplace.jobs.job(JobId(job_id)))
}

pub(crate) async fn create_job_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
    Json(draft): Json<JobDraft>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::CREATED, marketplace.jobs.create_job(caller, draft))
}

pub(crate) async fn provider_jobs_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, marketplace.jobs.provider_jobs(caller))
}

pub(crate) async fn update_job_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(job_id): Path<u64>,
    headers: HeaderMap,
    Json(draft): Json<JobDraft>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.jobs.update_job(caller, JobId(job_id), draft),
    )
}

pub(crate) async fn apply_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(job_id): Path<u64>,
    headers: HeaderMap,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    let result = marketplace
        .lifecycle
        .apply(caller, JobId(job_id), request.message);
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn applied_jobs_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.lifecycle.applied_jobs_for_seeker(caller),
    )
}

pub(crate) async fn job_applications_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(job_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .lifecycle
            .applications_for_job(caller, JobId(job_id)),
    )
}

pub(crate) async fn delete_job_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(job_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.deletion.delete_job(caller, JobId(job_id)),
    )
}

pub(crate) async fn withdraw_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    let id = ApplicationId(application_id);
    let result = marketplace
        .lifecycle
        .withdraw(caller, id)
        .map(|()| json!({ "application_id": id, "status": "withdrawn" }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn accept_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .lifecycle
            .provider_accept(caller, ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .lifecycle
            .provider_reject(caller, ApplicationId(application_id)),
    )
}

pub(crate) async fn hide_seeker_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .lifecycle
            .hide_for_seeker(caller, ApplicationId(application_id)),
    )
}

pub(crate) async fn hide_provider_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(application_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .lifecycle
            .hide_for_provider(caller, ApplicationId(application_id)),
    )
}

pub(crate) async fn send_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(room_id): Path<u64>,
    headers: HeaderMap,
    Json(request): Json<SendMessageRequest>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        marketplace
            .chat
            .send(caller, ChatRoomId(room_id), request.content),
    )
}

pub(crate) async fn history_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(room_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.chat.history(caller, ChatRoomId(room_id)),
    )
}

pub(crate) async fn unread_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(room_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.chat.unread_count(caller, ChatRoomId(room_id)),
    )
}

pub(crate) async fn mark_read_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(room_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    let room = ChatRoomId(room_id);
    let result = marketplace
        .chat
        .mark_read(caller, room)
        .map(|marked| json!({ "room_id": room, "marked_read": marked }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn partner_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(room_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.chat.chat_partner(caller, ChatRoomId(room_id)),
    )
}

pub(crate) async fn admin_records_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, marketplace.lifecycle.admin_records(caller))
}

pub(crate) async fn seekers_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, marketplace.directory.seekers(caller))
}

pub(crate) async fn providers_handler<R, P>(
    State(marketplace): Shared<R, P>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(StatusCode::OK, marketplace.directory.providers(caller))
}

pub(crate) async fn delete_seeker_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(user_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.deletion.delete_seeker(caller, UserId(user_id)),
    )
}

pub(crate) async fn delete_provider_handler<R, P>(
    State(marketplace): Shared<R, P>,
    Path(user_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    let caller = caller_or_reject!(headers);
    respond(
        StatusCode::OK,
        marketplace.deletion.delete_provider(caller, UserId(user_id)),
    )
}
