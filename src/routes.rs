//! HTTP surface of the server. Handlers only unpack the request and call into
//! [`crate::commands`].

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::{
    ADD_GROCERY_ITEM, BULK_DELETE_GROCERY_ITEMS, DELETE_GROCERY_ITEM, GET_GROCERY_LIST, HEALTH,
    UPDATE_GROCERY_ITEM_IS_CHECKED,
};
use crate::commands::{
    add_item_impl, delete_item_impl, delete_items_impl, get_list_impl, set_checked_impl,
    update_item_impl, CommandError, ServerCtx,
};
use crate::models::{GroceryItem, GroceryList};
use crate::state::AppState;

#[derive(Clone)]
pub struct ServerState {
    state: AppState,
    ctx: Arc<ServerCtx>,
    token: Option<Arc<str>>,
}

impl ServerState {
    /// An empty or missing token disables authentication.
    pub fn new(state: AppState, ctx: ServerCtx, token: Option<String>) -> Self {
        Self {
            state,
            ctx: Arc::new(ctx),
            token: token
                .filter(|token| !token.trim().is_empty())
                .map(Arc::from),
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = match &self {
            CommandError::NotFound(_) => StatusCode::NOT_FOUND,
            CommandError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CommandError::Storage(error) => {
                log::error!("storage failure while handling request: {error}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub fn router(server: ServerState) -> Router {
    let api = Router::new()
        .route(GET_GROCERY_LIST, get(get_list))
        .route(ADD_GROCERY_ITEM, post(add_item).put(update_item))
        .route(UPDATE_GROCERY_ITEM_IS_CHECKED, put(set_checked))
        .route(DELETE_GROCERY_ITEM, delete(delete_item))
        .route(BULK_DELETE_GROCERY_ITEMS, post(delete_items))
        .route_layer(middleware::from_fn_with_state(server.clone(), require_token));

    Router::new()
        .route(HEALTH, get(health))
        .merge(api)
        .with_state(server)
}

async fn require_token(State(server): State<ServerState>, request: Request, next: Next) -> Response {
    let Some(expected) = server.token.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if presented == Some(expected) {
        return next.run(request).await;
    }
    log::warn!(
        "rejected unauthenticated request method={} path={}",
        request.method(),
        request.uri().path()
    );
    (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn get_list(State(server): State<ServerState>) -> Json<GroceryList> {
    Json(get_list_impl(server.ctx.as_ref(), &server.state))
}

async fn add_item(
    State(server): State<ServerState>,
    Json(item): Json<GroceryItem>,
) -> Result<(StatusCode, Json<GroceryItem>), CommandError> {
    let created = add_item_impl(server.ctx.as_ref(), &server.state, item)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_item(
    State(server): State<ServerState>,
    Json(item): Json<GroceryItem>,
) -> Result<StatusCode, CommandError> {
    update_item_impl(server.ctx.as_ref(), &server.state, item)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_checked(
    State(server): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(is_checked): Json<bool>,
) -> Result<StatusCode, CommandError> {
    set_checked_impl(server.ctx.as_ref(), &server.state, id, is_checked)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_item(
    State(server): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, CommandError> {
    delete_item_impl(server.ctx.as_ref(), &server.state, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_items(
    State(server): State<ServerState>,
    Json(ids): Json<Vec<Uuid>>,
) -> Result<StatusCode, CommandError> {
    delete_items_impl(server.ctx.as_ref(), &server.state, ids)?;
    Ok(StatusCode::NO_CONTENT)
}
