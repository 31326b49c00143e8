use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::app::notifications::UnreadTracker;
use crate::app::services::ServiceError;
use crate::app::sync::{ChannelStatus, StatusBoard};

#[derive(Clone)]
pub struct ApiState {
    pub board: Arc<StatusBoard>,
    pub notifications: Arc<UnreadTracker>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnreadResponse {
    pub unread: u64,
    pub last_viewed_at: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub channels: BTreeMap<String, ChannelStatus>,
    pub notifications: UnreadResponse,
    pub notifications_delivered: u64,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(status_endpoint)
        .service(unread_endpoint)
        .service(mark_viewed_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/status")]
async fn status_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let notifications = match unread_response(&state.notifications) {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };

    HttpResponse::Ok().json(StatusResponse {
        channels: state.board.snapshot(),
        notifications,
        notifications_delivered: state.notifications.delivered(),
    })
}

#[get("/notifications/unread")]
async fn unread_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match unread_response(&state.notifications) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(error) => service_error_response(error),
    }
}

#[post("/notifications/viewed")]
async fn mark_viewed_endpoint(state: web::Data<ApiState>) -> impl Responder {
    if let Err(error) = state.notifications.mark_viewed(Utc::now()) {
        return service_error_response(error);
    }
    match unread_response(&state.notifications) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(error) => service_error_response(error),
    }
}

fn unread_response(tracker: &UnreadTracker) -> Result<UnreadResponse, ServiceError> {
    Ok(UnreadResponse {
        unread: tracker.unread(),
        last_viewed_at: tracker.last_viewed_at()?.map(format_timestamp),
    })
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::StoreLockPoisoned => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "state store lock poisoned"
            }))
        }
        ServiceError::StateStore(error) => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("state store query failed: {error}")
            }))
        }
    }
}
