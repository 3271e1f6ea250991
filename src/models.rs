use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ValidationError;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    /// Exact match only; "easy" is not "Easy".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::InvalidDifficulty(other.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
    pub review_count: i64,
}

/// Body of `POST /api/flashcards`. Every field is optional on the wire so
/// that missing values surface as validation errors rather than as
/// deserialization rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFlashcardRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// Body of `PUT /api/flashcards/:id`. An omitted (or blank) category or
/// difficulty leaves the stored value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFlashcardRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// The user-editable fields of a flashcard after trimming and defaulting.
/// Only `validate_fields` builds one, so holding a value means the
/// question/answer/difficulty invariants already hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardFields {
    pub question: String,
    pub answer: String,
    pub category: String,
    pub difficulty: Difficulty,
}

/// Validated update. `None` keeps what is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardChanges {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

fn required_text<'a>(
    question: Option<&'a str>,
    answer: Option<&'a str>,
) -> Result<(&'a str, &'a str), ValidationError> {
    let question = question.map(str::trim).unwrap_or_default();
    let answer = answer.map(str::trim).unwrap_or_default();
    if question.is_empty() || answer.is_empty() {
        return Err(ValidationError::MissingQuestionOrAnswer);
    }
    Ok((question, answer))
}

fn optional_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

// A blank difficulty is treated like an omitted one.
fn optional_difficulty(difficulty: Option<&str>) -> Result<Option<Difficulty>, ValidationError> {
    difficulty
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::parse::<Difficulty>)
        .transpose()
}

pub fn validate_fields(
    question: Option<&str>,
    answer: Option<&str>,
    category: Option<&str>,
    difficulty: Option<&str>,
) -> Result<FlashcardFields, ValidationError> {
    let (question, answer) = required_text(question, answer)?;
    Ok(FlashcardFields {
        question: question.to_string(),
        answer: answer.to_string(),
        category: optional_category(category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        difficulty: optional_difficulty(difficulty)?.unwrap_or_default(),
    })
}

pub fn validate_changes(
    question: Option<&str>,
    answer: Option<&str>,
    category: Option<&str>,
    difficulty: Option<&str>,
) -> Result<FlashcardChanges, ValidationError> {
    let (question, answer) = required_text(question, answer)?;
    Ok(FlashcardChanges {
        question: question.to_string(),
        answer: answer.to_string(),
        category: optional_category(category),
        difficulty: optional_difficulty(difficulty)?,
    })
}

impl CreateFlashcardRequest {
    pub fn validate(&self) -> Result<FlashcardFields, ValidationError> {
        validate_fields(
            self.question.as_deref(),
            self.answer.as_deref(),
            self.category.as_deref(),
            self.difficulty.as_deref(),
        )
    }
}

impl UpdateFlashcardRequest {
    pub fn validate(&self) -> Result<FlashcardChanges, ValidationError> {
        validate_changes(
            self.question.as_deref(),
            self.answer.as_deref(),
            self.category.as_deref(),
            self.difficulty.as_deref(),
        )
    }
}

impl From<FlashcardFields> for CreateFlashcardRequest {
    fn from(fields: FlashcardFields) -> Self {
        Self {
            question: Some(fields.question),
            answer: Some(fields.answer),
            category: Some(fields.category),
            difficulty: Some(fields.difficulty.to_string()),
        }
    }
}

impl From<FlashcardChanges> for UpdateFlashcardRequest {
    fn from(changes: FlashcardChanges) -> Self {
        Self {
            question: Some(changes.question),
            answer: Some(changes.answer),
            category: changes.category,
            difficulty: changes.difficulty.map(|d| d.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_optional_fields_missing() {
        let fields = validate_fields(Some("Q"), Some("A"), None, None).unwrap();
        assert_eq!(fields.category, "General");
        assert_eq!(fields.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_blank_category_defaults_to_general() {
        let fields = validate_fields(Some("Q"), Some("A"), Some("   "), Some("Hard")).unwrap();
        assert_eq!(fields.category, "General");
        assert_eq!(fields.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let fields =
            validate_fields(Some("  What is Rust?  "), Some("\tA language\n"), Some(" Lang "), None)
                .unwrap();
        assert_eq!(fields.question, "What is Rust?");
        assert_eq!(fields.answer, "A language");
        assert_eq!(fields.category, "Lang");
    }

    #[test]
    fn test_empty_question_or_answer_rejected() {
        assert!(matches!(
            validate_fields(Some("   "), Some("A"), None, None),
            Err(ValidationError::MissingQuestionOrAnswer)
        ));
        assert!(matches!(
            validate_fields(Some("Q"), None, None, None),
            Err(ValidationError::MissingQuestionOrAnswer)
        ));
    }

    #[test]
    fn test_unknown_difficulty_rejected() {
        let result = validate_fields(Some("Q"), Some("A"), None, Some("Impossible"));
        assert!(matches!(result, Err(ValidationError::InvalidDifficulty(d)) if d == "Impossible"));

        // Case matters
        assert!("easy".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_changes_leave_omitted_fields_unset() {
        let changes = validate_changes(Some(" Q "), Some("A"), None, Some("  ")).unwrap();
        assert_eq!(changes.question, "Q");
        assert_eq!(changes.category, None);
        assert_eq!(changes.difficulty, None);

        let changes = validate_changes(Some("Q"), Some("A"), Some(" Rust "), Some("Easy")).unwrap();
        assert_eq!(changes.category.as_deref(), Some("Rust"));
        assert_eq!(changes.difficulty, Some(Difficulty::Easy));

        assert!(validate_changes(Some("Q"), Some(""), None, None).is_err());
        assert!(validate_changes(Some("Q"), Some("A"), None, Some("medium")).is_err());
    }

    #[test]
    fn test_update_request_omits_unset_fields_on_the_wire() {
        let changes = validate_changes(Some("Q"), Some("A"), None, None).unwrap();
        let value = serde_json::to_value(UpdateFlashcardRequest::from(changes)).unwrap();
        assert_eq!(value, serde_json::json!({ "question": "Q", "answer": "A" }));
    }

    #[test]
    fn test_flashcard_serializes_camel_case() {
        let now = Utc::now();
        let card = Flashcard {
            id: Uuid::new_v4(),
            question: "Q".to_string(),
            answer: "A".to_string(),
            category: "General".to_string(),
            difficulty: Difficulty::Hard,
            created_at: now,
            last_reviewed: now,
            review_count: 2,
        };

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["difficulty"], "Hard");
        assert_eq!(value["reviewCount"], 2);
        assert!(value["createdAt"].is_string());
        assert!(value["lastReviewed"].is_string());
    }
}
