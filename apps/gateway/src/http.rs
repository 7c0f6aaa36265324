//! HTTP trigger surface: translates requests into bus events and nothing
//! else. Routing, delivery, and reconciliation all happen behind the bus.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pushbridge_bus::{Bus, Event};
use pushbridge_core::{
    ClientStatus, FcmRegistration, Message, MessageBody, SendType, WebPushRegistration,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Clone)]
struct AppState {
    bus: Bus,
}

pub fn build_router(bus: Bus) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/message", post(send_message))
        .route("/status", post(client_status))
        .route("/register/fcm", post(register_fcm))
        .route("/register/webpush", post(register_webpush))
        .route("/callback/fcm", post(fcm_callback))
        .route("/callback/webpush", post(webpush_callback))
        .with_state(AppState { bus })
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    #[serde(default)]
    mid: Option<String>,
    send_type: SendType,
    target: String,
    text: String,
    #[serde(default)]
    desp: Option<String>,
    #[serde(default)]
    extra: BTreeMap<String, Value>,
}

async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> (StatusCode, Json<Value>) {
    let mid = request
        .mid
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(%mid, target = %request.target, "message accepted");
    state.bus.publish(Event::MessageStart(Message {
        mid: mid.clone(),
        send_type: request.send_type,
        target: request.target,
        message: MessageBody {
            text: request.text,
            desp: request.desp,
            extra: request.extra,
        },
    }));
    (StatusCode::ACCEPTED, Json(json!({ "mid": mid })))
}

#[derive(Deserialize)]
struct StatusRequest {
    name: String,
    mid: String,
    status: ClientStatus,
}

async fn client_status(
    State(state): State<AppState>,
    Json(request): Json<StatusRequest>,
) -> StatusCode {
    state.bus.publish(Event::MessageClientStatus {
        name: request.name,
        mid: request.mid,
        status: request.status,
    });
    StatusCode::ACCEPTED
}

async fn register_fcm(
    State(state): State<AppState>,
    Json(registration): Json<FcmRegistration>,
) -> StatusCode {
    state.bus.publish(Event::RegisterFcm(registration));
    StatusCode::ACCEPTED
}

async fn register_webpush(
    State(state): State<AppState>,
    Json(registration): Json<WebPushRegistration>,
) -> StatusCode {
    state.bus.publish(Event::RegisterWebPush(registration));
    StatusCode::ACCEPTED
}

#[derive(Deserialize)]
struct CallbackRequest {
    mid: String,
    name: String,
}

async fn fcm_callback(
    State(state): State<AppState>,
    Json(request): Json<CallbackRequest>,
) -> StatusCode {
    state.bus.publish(Event::MessageFcmCallback {
        mid: request.mid,
        name: request.name,
    });
    StatusCode::ACCEPTED
}

async fn webpush_callback(
    State(state): State<AppState>,
    Json(request): Json<CallbackRequest>,
) -> StatusCode {
    state.bus.publish(Event::MessageWebPushCallback {
        mid: request.mid,
        name: request.name,
    });
    StatusCode::ACCEPTED
}
