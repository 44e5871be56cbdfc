// src/docs.rs

use utoipa::OpenApi;
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Leitura ---
        handlers::board::get_board,
        handlers::board::get_metrics,
        handlers::board::list_changes,
        handlers::board::reload_board,

        // --- Mutações ---
        handlers::board::transition_case,
        handlers::board::return_case,
        handlers::board::update_case,
        handlers::board::delete_case,
        handlers::board::save_board,
    ),
    components(
        schemas(
            // --- Casos ---
            models::collection::Stage,
            models::collection::StatusChange,
            models::collection::StatusHistory,
            models::collection::FollowUp,
            models::collection::CollectionCase,
            models::actor::Role,

            // --- Quadro ---
            models::board::DenialReason,
            models::board::Notice,
            models::board::Outcome,
            models::board::StageColumn,
            models::board::BoardView,
            models::board::BoardMetrics,
            models::board::ChangeKind,
            models::board::ChangeEvent,

            // --- Payloads ---
            handlers::board::TransitionPayload,
            handlers::board::OutcomeResponse,
            handlers::board::ReloadResponse,
            handlers::board::ChangesResponse,
            common::error::ApiErrorBody,
        )
    ),
    tags(
        (name = "Board", description = "Quadro de cobrança: etapas, movimentos e edição de casos")
    )
)]
pub struct ApiDoc;
