use anyhow::Result;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::{debug, error};

use crate::history_store::HistoryStore;
use crate::user::auth::AuthTokenValue;
use crate::user::{UserManager, UserStore};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::State,
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::session::Session;
use super::state::{GuardedUserManager, ServerState};
use super::stats_routes::stats_routes;
use super::upload_routes::history_routes;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

fn auth_success_response(user_id: usize, username: &str, token_value: &str) -> Response {
    let response_body = serde_json::to_string(&json!({
        "success": true,
        "token": token_value,
        "user": {"id": user_id, "username": username},
    }))
    .unwrap();

    let cookie_value = HeaderValue::from_str(&format!(
        "session_token={}; Path=/; HttpOnly",
        token_value
    ))
    .unwrap();

    response::Builder::new()
        .status(StatusCode::OK)
        .header(header::SET_COOKIE, cookie_value)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response_body))
        .unwrap()
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegisterBody>,
) -> Response {
    let manager = user_manager.lock().unwrap();
    let user_id = match manager.register_user(&body.username, &body.password) {
        Ok(user_id) => user_id,
        Err(err) => {
            debug!("Registration rejected for {}: {}", body.username, err);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "message": err.to_string()})),
            )
                .into_response();
        }
    };

    match manager.generate_auth_token(user_id) {
        Ok(token) => auth_success_response(user_id, &body.username, &token.value.0),
        Err(err) => {
            error!("Error with auth token generation: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for {}", body.username);
    let manager = user_manager.lock().unwrap();
    match manager.verify_password(&body.username, &body.password) {
        Ok(Some(user_id)) => match manager.generate_auth_token(user_id) {
            Ok(token) => auth_success_response(user_id, &body.username, &token.value.0),
            Err(err) => {
                error!("Error with auth token generation: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "message": "Invalid credentials"})),
        )
            .into_response(),
        Err(err) => {
            error!("Login failed for {}: {}", body.username, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let manager = user_manager.lock().unwrap();
    match manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub fn make_app(
    config: ServerConfig,
    user_store: Arc<dyn UserStore>,
    history_store: Arc<dyn HistoryStore>,
) -> Result<Router> {
    let user_manager = Arc::new(Mutex::new(UserManager::new(user_store)));
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        user_manager,
        history_store,
        hash: env!("GIT_HASH").to_string(),
    };

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let history_router = history_routes(&config).with_state(state.clone());
    let stats_router = stats_routes().with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/history", history_router)
        .nest("/v1/stats", stats_router)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    user_store: Arc<dyn UserStore>,
    history_store: Arc<dyn HistoryStore>,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, user_store, history_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
