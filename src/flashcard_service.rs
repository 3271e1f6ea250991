use uuid::Uuid;

use crate::database::Database;
use crate::errors::ApiError;
use crate::log_validation;
use crate::models::*;

/// Store operations with request validation in front of the database.
#[derive(Clone)]
pub struct FlashcardService {
    db: Database,
}

impl FlashcardService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list_flashcards(&self) -> Result<Vec<Flashcard>, ApiError> {
        Ok(self.db.get_all_flashcards().await?)
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Flashcard>, ApiError> {
        Ok(self.db.get_flashcards_by_category(category).await?)
    }

    pub async fn get_flashcard(&self, id: Uuid) -> Result<Flashcard, ApiError> {
        self.db
            .get_flashcard(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create_flashcard(&self, request: CreateFlashcardRequest) -> Result<Flashcard, ApiError> {
        let fields = request.validate().inspect_err(|e| {
            log_validation!(failure, "create_flashcard", error = e);
        })?;
        Ok(self.db.create_flashcard(fields).await?)
    }

    /// Validation runs before the lookup, so a bad body against an unknown
    /// id is reported as a validation error.
    pub async fn update_flashcard(
        &self,
        id: Uuid,
        request: UpdateFlashcardRequest,
    ) -> Result<Flashcard, ApiError> {
        let changes = request.validate().inspect_err(|e| {
            log_validation!(failure, "update_flashcard", error = e);
        })?;
        self.db
            .update_flashcard(id, changes)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete_flashcard(&self, id: Uuid) -> Result<(), ApiError> {
        if self.db.delete_flashcard(id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn increment_review(&self, id: Uuid) -> Result<Flashcard, ApiError> {
        self.db
            .increment_review(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn distinct_categories(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.db.get_distinct_categories().await?)
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Flashcard with ID '{}' not found", id))
}
