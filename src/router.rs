// src/router.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

pub fn build_router(app_state: AppState) -> Router {
    let board_routes = Router::new()
        .route("/metrics", get(handlers::board::get_metrics))
        .route("/changes", get(handlers::board::list_changes))
        .route("/reload", post(handlers::board::reload_board))
        .route("/save", post(handlers::board::save_board))
        .route(
            "/cases/{id}",
            put(handlers::board::update_case).delete(handlers::board::delete_case),
        )
        .route("/cases/{id}/transition", post(handlers::board::transition_case))
        .route("/cases/{id}/return", post(handlers::board::return_case));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::board::health))
        .route("/api/board", get(handlers::board::get_board))
        .nest("/api/board", board_routes)
        .with_state(app_state)
}
