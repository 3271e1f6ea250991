pub mod api;
pub mod client;
pub mod config;
pub mod database;
pub mod errors;
pub mod flashcard_service;
pub mod logging;
pub mod models;
pub mod session;
pub mod study;
pub mod working_set;

pub use client::{FlashcardApi, HttpFlashcardClient};
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use flashcard_service::FlashcardService;
pub use models::*;
pub use session::SessionController;
pub use study::{Side, StudyState};
pub use working_set::{Filter, WorkingSet};
