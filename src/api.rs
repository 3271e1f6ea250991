use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, put},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::{ApiError, ErrorContext, ErrorReply},
    flashcard_service::FlashcardService,
    models::*,
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub flashcard_service: FlashcardService,
}

/// An id that does not parse can never name a stored flashcard.
fn parse_flashcard_id(raw: &str, operation: &str) -> Result<Uuid, ErrorReply> {
    Uuid::parse_str(raw).map_err(|_| {
        log_api_warn!(operation, flashcard_id = raw, "malformed flashcard id");
        ApiError::NotFound(format!("Flashcard with ID '{}' not found", raw))
            .to_response_with_context(ErrorContext::new(operation, "flashcard").with_id(raw))
    })
}

/// Unreadable bodies (bad JSON, wrong field types, wrong content type) are
/// answered like any other validation failure.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, operation: &str) -> Result<T, ErrorReply> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError::ValidationError(format!("Invalid request body: {}", rejection.body_text()))
            .to_response_with_context(ErrorContext::new(operation, "flashcard"))
    })
}

pub async fn list_flashcards(
    State(state): State<AppState>,
) -> Result<Json<Vec<Flashcard>>, ErrorReply> {
    log_api_start!("list_flashcards");

    match state.flashcard_service.list_flashcards().await {
        Ok(cards) => {
            log_api_success!("list_flashcards", count = cards.len(), "flashcards listed");
            Ok(Json(cards))
        }
        Err(e) => {
            let context = ErrorContext::new("list_flashcards", "flashcard")
                .with_user_message("Error fetching flashcards");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn list_flashcards_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Flashcard>>, ErrorReply> {
    log_api_start!("list_flashcards_by_category", category = category);

    match state.flashcard_service.list_by_category(&category).await {
        Ok(cards) => {
            log_api_success!(
                "list_flashcards_by_category",
                count = cards.len(),
                "flashcards listed for category"
            );
            Ok(Json(cards))
        }
        Err(e) => {
            let context = ErrorContext::new("list_flashcards_by_category", "flashcard")
                .with_id(&category)
                .with_user_message("Error fetching flashcards by category");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn create_flashcard(
    State(state): State<AppState>,
    payload: Result<Json<CreateFlashcardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Flashcard>), ErrorReply> {
    log_api_start!("create_flashcard");
    let request = json_body(payload, "create_flashcard")?;

    match state.flashcard_service.create_flashcard(request).await {
        Ok(card) => {
            log_api_success!("create_flashcard", flashcard_id = card.id, "flashcard created");
            Ok((StatusCode::CREATED, Json(card)))
        }
        Err(e) => {
            let context = ErrorContext::new("create_flashcard", "flashcard")
                .with_user_message("Error creating flashcard");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn update_flashcard(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateFlashcardRequest>, JsonRejection>,
) -> Result<Json<Flashcard>, ErrorReply> {
    let id = parse_flashcard_id(&raw_id, "update_flashcard")?;
    log_api_start!("update_flashcard", flashcard_id = id);
    let request = json_body(payload, "update_flashcard")?;

    match state.flashcard_service.update_flashcard(id, request).await {
        Ok(card) => {
            log_api_success!("update_flashcard", flashcard_id = id, "flashcard updated");
            Ok(Json(card))
        }
        Err(e) => {
            let mut context = ErrorContext::new("update_flashcard", "flashcard").with_id(&raw_id);
            if matches!(e, ApiError::DatabaseError(_)) {
                context = context.with_user_message("Error updating flashcard");
            }
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn delete_flashcard(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    let id = parse_flashcard_id(&raw_id, "delete_flashcard")?;
    log_api_start!("delete_flashcard", flashcard_id = id);

    match state.flashcard_service.delete_flashcard(id).await {
        Ok(()) => {
            log_api_success!("delete_flashcard", flashcard_id = id, "flashcard deleted");
            Ok(Json(MessageResponse {
                message: "Flashcard deleted successfully".to_string(),
            }))
        }
        Err(e) => {
            let mut context = ErrorContext::new("delete_flashcard", "flashcard").with_id(&raw_id);
            if matches!(e, ApiError::DatabaseError(_)) {
                context = context.with_user_message("Error deleting flashcard");
            }
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn review_flashcard(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Flashcard>, ErrorReply> {
    let id = parse_flashcard_id(&raw_id, "review_flashcard")?;
    log_api_start!("review_flashcard", flashcard_id = id);

    match state.flashcard_service.increment_review(id).await {
        Ok(card) => {
            log_api_success!("review_flashcard", flashcard_id = id, "review count incremented");
            Ok(Json(card))
        }
        Err(e) => {
            let mut context = ErrorContext::new("review_flashcard", "flashcard").with_id(&raw_id);
            if matches!(e, ApiError::DatabaseError(_)) {
                context = context.with_user_message("Error updating review count");
            }
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ErrorReply> {
    log_api_start!("list_categories");

    match state.flashcard_service.distinct_categories().await {
        Ok(categories) => {
            log_api_success!("list_categories", count = categories.len(), "categories listed");
            Ok(Json(categories))
        }
        Err(e) => {
            let context = ErrorContext::new("list_categories", "category")
                .with_user_message("Error fetching categories");
            Err(e.to_response_with_context(context))
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Flashcard routes
        .route("/api/flashcards", get(list_flashcards).post(create_flashcard))
        .route("/api/flashcards/category/:category", get(list_flashcards_by_category))
        .route("/api/flashcards/:id", put(update_flashcard).delete(delete_flashcard))
        .route("/api/flashcards/:id/review", patch(review_flashcard))

        // Category routes
        .route("/api/categories", get(list_categories))

        .route("/api/health", get(health))
        .with_state(state)
}
