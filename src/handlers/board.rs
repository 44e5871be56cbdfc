// src/handlers/board.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::{
        error::{ApiError, ApiErrorBody, AppError},
        i18n::I18nStore,
    },
    config::AppState,
    middleware::{actor::CurrentUser, i18n::Locale},
    models::{
        board::{BoardMetrics, BoardView, ChangeEvent, DenialReason, Outcome},
        collection::{CollectionCase, Stage},
    },
    services::period_filter::parse_period,
};

// =============================================================================
//  PAYLOADS E RESPOSTAS
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    /// Mês dos pagamentos exibidos (AAAA-MM). Sem valor, mostra todos.
    #[param(example = "2025-01")]
    pub period: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChangesQuery {
    /// Devolve só eventos com sequência maior que esta.
    pub after: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    #[schema(example = "message_sent")]
    pub target_stage: Stage,
}

/// Resultado de uma operação do quadro, com a mensagem pronta para o usuário.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    #[serde(flatten)]
    pub outcome: Outcome,
    // Reentrância não tem mensagem: o cliente só descarta o clique
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangesResponse {
    pub latest_seq: u64,
    pub events: Vec<ChangeEvent>,
}

// --- Outcome -> HTTP ---

fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Applied { .. } | Outcome::Removed { .. } | Outcome::Saved { .. } | Outcome::Info { .. } => {
            StatusCode::OK
        }
        Outcome::Denied { reason: DenialReason::ForbiddenEdit } => StatusCode::FORBIDDEN,
        Outcome::Denied { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Outcome::Invalid { .. } => StatusCode::BAD_REQUEST,
        Outcome::NotFound { .. } => StatusCode::NOT_FOUND,
        Outcome::Failed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Outcome::Ignored => StatusCode::CONFLICT,
    }
}

fn outcome_response(
    outcome: Outcome,
    success_key: &str,
    locale: &Locale,
    i18n: &I18nStore,
) -> (StatusCode, Json<OutcomeResponse>) {
    let lang = locale.0.as_str();
    let (message, hint) = match &outcome {
        Outcome::Applied { .. } | Outcome::Removed { .. } | Outcome::Saved { .. } => {
            (Some(i18n.translate(lang, success_key)), None)
        }
        Outcome::Info { notice } => (Some(i18n.notice(lang, *notice)), None),
        Outcome::Denied { reason } => {
            let (title, hint) = i18n.denial(lang, *reason);
            (Some(title), Some(hint))
        }
        Outcome::Invalid { .. } => (Some(i18n.translate(lang, "outcome.invalid")), None),
        Outcome::NotFound { .. } => (Some(i18n.translate(lang, "outcome.not_found")), None),
        Outcome::Failed { .. } => (Some(i18n.translate(lang, "outcome.failed")), None),
        Outcome::Ignored => {
            tracing::debug!("Operação ignorada por reentrância");
            (None, None)
        }
    };

    (outcome_status(&outcome), Json(OutcomeResponse { outcome, message, hint }))
}

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/board
#[utoipa::path(
    get,
    path = "/api/board",
    tag = "Board",
    params(BoardQuery),
    responses(
        (status = 200, description = "Quadro agrupado por etapa", body = BoardView),
        (status = 400, description = "Período inválido", body = ApiErrorBody)
    )
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = query.period.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

    if let Some(period) = period.as_deref() {
        if parse_period(period).is_none() {
            return Err(AppError::InvalidPeriod(period.to_string())
                .to_api_error(&locale, &app_state.i18n_store));
        }
    }

    app_state.board.set_period(period).await;

    let i18n = &app_state.i18n_store;
    let view = app_state.board.view(|stage| i18n.stage_title(&locale.0, stage));

    Ok((StatusCode::OK, Json(view)))
}

// GET /api/board/metrics
#[utoipa::path(
    get,
    path = "/api/board/metrics",
    tag = "Board",
    responses(
        (status = 200, description = "Indicadores por faixa de atraso", body = BoardMetrics)
    )
)]
pub async fn get_metrics(State(app_state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app_state.board.metrics()))
}

// GET /api/board/changes
#[utoipa::path(
    get,
    path = "/api/board/changes",
    tag = "Board",
    params(ChangesQuery),
    responses(
        (status = 200, description = "Mudanças publicadas depois da sequência informada", body = ChangesResponse)
    )
)]
pub async fn list_changes(
    State(app_state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> impl IntoResponse {
    let events = app_state.change_feed.since(query.after.unwrap_or(0));
    let latest_seq = app_state.change_feed.latest_seq();
    (StatusCode::OK, Json(ChangesResponse { latest_seq, events }))
}

// POST /api/board/reload
#[utoipa::path(
    post,
    path = "/api/board/reload",
    tag = "Board",
    responses(
        (status = 200, description = "Quadro recarregado do banco", body = ReloadResponse),
        (status = 503, description = "Banco indisponível", body = ApiErrorBody)
    )
)]
pub async fn reload_board(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let count = app_state
        .board
        .load()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ReloadResponse { count })))
}

// =============================================================================
//  MUTAÇÕES
// =============================================================================

// POST /api/board/cases/{id}/transition
#[utoipa::path(
    post,
    path = "/api/board/cases/{id}/transition",
    tag = "Board",
    request_body = TransitionPayload,
    params(
        ("id" = String, Path, description = "ID do caso"),
        ("x-user-name" = Option<String>, Header, description = "Usuário autenticado pelo gateway"),
        ("x-user-role" = Option<String>, Header, description = "admin | member")
    ),
    responses(
        (status = 200, description = "Caso movido", body = OutcomeResponse),
        (status = 404, description = "Caso não encontrado", body = OutcomeResponse),
        (status = 409, description = "Caso já em processamento", body = OutcomeResponse),
        (status = 422, description = "Movimento recusado pelas regras do funil", body = OutcomeResponse),
        (status = 503, description = "Falha ao gravar; alteração desfeita", body = OutcomeResponse)
    )
)]
pub async fn transition_case(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TransitionPayload>,
) -> impl IntoResponse {
    let outcome = app_state
        .board
        .request_transition(&id, payload.target_stage, &actor)
        .await;

    outcome_response(outcome, "outcome.applied", &locale, &app_state.i18n_store)
}

// POST /api/board/cases/{id}/return
#[utoipa::path(
    post,
    path = "/api/board/cases/{id}/return",
    tag = "Board",
    params(
        ("id" = String, Path, description = "ID do caso"),
        ("x-user-name" = Option<String>, Header, description = "Usuário autenticado pelo gateway")
    ),
    responses(
        (status = 200, description = "Caso voltou uma etapa (ou já estava na primeira)", body = OutcomeResponse),
        (status = 404, description = "Caso não encontrado", body = OutcomeResponse),
        (status = 503, description = "Falha ao gravar; alteração desfeita", body = OutcomeResponse)
    )
)]
pub async fn return_case(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = app_state.board.return_to_previous(&id, &actor).await;
    outcome_response(outcome, "outcome.applied", &locale, &app_state.i18n_store)
}

// PUT /api/board/cases/{id}
#[utoipa::path(
    put,
    path = "/api/board/cases/{id}",
    tag = "Board",
    request_body = CollectionCase,
    params(
        ("id" = String, Path, description = "ID do caso"),
        ("x-user-name" = Option<String>, Header, description = "Usuário autenticado pelo gateway"),
        ("x-user-role" = Option<String>, Header, description = "admin | member")
    ),
    responses(
        (status = 200, description = "Dados atualizados", body = OutcomeResponse),
        (status = 400, description = "Dados inválidos", body = OutcomeResponse),
        (status = 403, description = "Sem permissão para editar", body = OutcomeResponse),
        (status = 404, description = "Caso não encontrado", body = OutcomeResponse)
    )
)]
pub async fn update_case(
    State(app_state): State<AppState>,
    locale: Locale,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(mut payload): Json<CollectionCase>,
) -> impl IntoResponse {
    // O id da rota manda
    payload.id = id;
    let outcome = app_state.board.update_record(payload, &actor).await;
    outcome_response(outcome, "outcome.updated", &locale, &app_state.i18n_store)
}

// DELETE /api/board/cases/{id}
#[utoipa::path(
    delete,
    path = "/api/board/cases/{id}",
    tag = "Board",
    params(
        ("id" = String, Path, description = "ID do caso")
    ),
    responses(
        (status = 200, description = "Caso excluído", body = OutcomeResponse),
        (status = 404, description = "Caso não encontrado", body = OutcomeResponse),
        (status = 503, description = "Falha ao excluir", body = OutcomeResponse)
    )
)]
pub async fn delete_case(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = app_state.board.delete_record(&id).await;
    outcome_response(outcome, "outcome.removed", &locale, &app_state.i18n_store)
}

// POST /api/board/save
#[utoipa::path(
    post,
    path = "/api/board/save",
    tag = "Board",
    responses(
        (status = 200, description = "Quadro salvo (ou nada para salvar)", body = OutcomeResponse),
        (status = 409, description = "Salvamento já em andamento", body = OutcomeResponse),
        (status = 503, description = "Falha ao salvar", body = OutcomeResponse)
    )
)]
pub async fn save_board(
    State(app_state): State<AppState>,
    locale: Locale,
) -> impl IntoResponse {
    let outcome = app_state.board.save_all().await;
    outcome_response(outcome, "outcome.saved", &locale, &app_state.i18n_store)
}

// GET /api/health
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "database": app_state.db_pool.is_some(),
    }))
}
