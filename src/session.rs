use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::client::FlashcardApi;
use crate::errors::{ClientError, SessionError};
use crate::models::*;
use crate::study::{Advance, Side, StudyState};
use crate::working_set::{Filter, WorkingSet};
use crate::log_session_event;

/// Client-side owner of the working set, the active filter and the study
/// session. Every change goes through one of the methods below.
pub struct SessionController<A: FlashcardApi + 'static> {
    api: Arc<A>,
    working_set: WorkingSet,
    categories: Vec<String>,
    filter: Filter,
    study: StudyState,
    /// Cards being studied, captured from the filtered view at start.
    deck: Vec<Flashcard>,
    pending_reviews: Vec<JoinHandle<()>>,
}

impl<A: FlashcardApi + 'static> SessionController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            working_set: WorkingSet::default(),
            categories: Vec::new(),
            filter: Filter::default(),
            study: StudyState::Idle,
            deck: Vec::new(),
            pending_reviews: Vec::new(),
        }
    }

    /// Fetch the full working set and the category list. A failure to load
    /// categories is logged and leaves the previous list in place.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let cards = self.api.list_flashcards().await?;
        self.working_set.replace_all(cards);
        self.refresh_categories().await;
        Ok(())
    }

    pub async fn refresh_categories(&mut self) {
        match self.api.categories().await {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                log_session_event!(warn, "load_categories", error = e);
            }
        }
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn filtered(&self) -> Vec<&Flashcard> {
        self.working_set.filtered(&self.filter)
    }

    pub async fn create(&mut self, draft: CreateFlashcardRequest) -> Result<Flashcard, ClientError> {
        let fields = draft.validate()?;
        let card = self.api.create_flashcard(&fields.into()).await?;
        self.working_set.insert_front(card.clone());
        log_session_event!(reconcile, "create", flashcard_id = card.id, applied = true);
        self.refresh_categories().await;
        Ok(card)
    }

    pub async fn update(&mut self, id: Uuid, draft: UpdateFlashcardRequest) -> Result<Flashcard, ClientError> {
        let changes = draft.validate()?;
        let card = self.api.update_flashcard(id, &changes.into()).await?;
        let applied = self.working_set.replace(card.clone());
        if let Some(slot) = self.deck.iter_mut().find(|c| c.id == card.id) {
            *slot = card.clone();
        }
        log_session_event!(reconcile, "update", flashcard_id = id, applied = applied);
        self.refresh_categories().await;
        Ok(card)
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<String, ClientError> {
        let message = self.api.delete_flashcard(id).await?;
        let applied = self.working_set.remove(id);
        log_session_event!(reconcile, "delete", flashcard_id = id, applied = applied);
        self.refresh_categories().await;
        Ok(message)
    }

    pub fn study_state(&self) -> StudyState {
        self.study
    }

    /// Begin a walkthrough of the currently filtered view.
    pub fn start_study(&mut self) -> Result<&Flashcard, SessionError> {
        let deck: Vec<Flashcard> = self.filtered().into_iter().cloned().collect();
        let state = StudyState::start(deck.len()).ok_or(SessionError::NothingToStudy)?;
        self.deck = deck;
        self.study = state;
        log_session_event!(transition, "start", cursor = 0, total = self.deck.len());
        self.current_card().ok_or(SessionError::NothingToStudy)
    }

    pub fn flip(&mut self) -> StudyState {
        self.study = self.study.flip();
        self.study
    }

    /// Marks the current card reviewed in the background and moves on.
    /// Returns `None` when no session is active.
    pub fn next(&mut self) -> Option<Advance> {
        let step = self.study.next(self.deck.len())?;
        if let Some(id) = self.deck.get(step.reviewed).map(|c| c.id) {
            self.spawn_review(id);
        }
        self.study = step.state;
        if step.completed() {
            log_session_event!(transition, "complete", cursor = step.reviewed, total = self.deck.len());
            self.deck.clear();
        } else {
            log_session_event!(transition, "next", cursor = step.reviewed + 1, total = self.deck.len());
        }
        Some(step)
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.study.cursor().and_then(|i| self.deck.get(i))
    }

    pub fn current_side(&self) -> Option<Side> {
        self.study.side()
    }

    /// One-based position and deck size while studying.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.study.cursor().map(|i| (i + 1, self.deck.len()))
    }

    /// Wait for outstanding review increments. Their outcome is already
    /// logged; nothing is reported back.
    pub async fn flush_reviews(&mut self) {
        for handle in self.pending_reviews.drain(..) {
            if let Err(e) = handle.await {
                log_session_event!(background_failure, "flush_reviews", error = e);
            }
        }
    }

    fn spawn_review(&mut self, id: Uuid) {
        self.pending_reviews.retain(|h| !h.is_finished());
        let api = Arc::clone(&self.api);
        self.pending_reviews.push(tokio::spawn(async move {
            if let Err(e) = api.increment_review(id).await {
                log_session_event!(background_failure, "increment_review", flashcard_id = id, error = e);
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::working_set::test_support::card;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-process stand-in for the HTTP store.
    #[derive(Default)]
    struct FakeApi {
        cards: Mutex<Vec<Flashcard>>,
        reviewed: Mutex<Vec<Uuid>>,
        fail_reviews: bool,
        panic_reviews: bool,
        requests: Mutex<usize>,
    }

    impl FakeApi {
        fn with_cards(cards: Vec<Flashcard>) -> Self {
            Self {
                cards: Mutex::new(cards),
                ..Default::default()
            }
        }

        fn reviewed(&self) -> Vec<Uuid> {
            self.reviewed.lock().unwrap().clone()
        }

        fn request_count(&self) -> usize {
            *self.requests.lock().unwrap()
        }

        fn bump(&self) {
            *self.requests.lock().unwrap() += 1;
        }

        fn not_found() -> ClientError {
            ClientError::Api {
                status: 404,
                message: "Flashcard not found".to_string(),
            }
        }
    }

    #[async_trait]
    impl FlashcardApi for FakeApi {
        async fn list_flashcards(&self) -> Result<Vec<Flashcard>, ClientError> {
            self.bump();
            Ok(self.cards.lock().unwrap().clone())
        }

        async fn list_by_category(&self, category: &str) -> Result<Vec<Flashcard>, ClientError> {
            self.bump();
            Ok(self
                .cards
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.category == category)
                .cloned()
                .collect())
        }

        async fn create_flashcard(&self, request: &CreateFlashcardRequest) -> Result<Flashcard, ClientError> {
            self.bump();
            let fields = request.validate()?;
            let now = Utc::now();
            let created = Flashcard {
                id: Uuid::new_v4(),
                question: fields.question,
                answer: fields.answer,
                category: fields.category,
                difficulty: fields.difficulty,
                created_at: now,
                last_reviewed: now,
                review_count: 0,
            };
            self.cards.lock().unwrap().insert(0, created.clone());
            Ok(created)
        }

        async fn update_flashcard(
            &self,
            id: Uuid,
            request: &UpdateFlashcardRequest,
        ) -> Result<Flashcard, ClientError> {
            self.bump();
            let changes = request.validate()?;
            let mut cards = self.cards.lock().unwrap();
            let card = cards.iter_mut().find(|c| c.id == id).ok_or_else(Self::not_found)?;
            card.question = changes.question;
            card.answer = changes.answer;
            if let Some(category) = changes.category {
                card.category = category;
            }
            if let Some(difficulty) = changes.difficulty {
                card.difficulty = difficulty;
            }
            Ok(card.clone())
        }

        async fn delete_flashcard(&self, id: Uuid) -> Result<String, ClientError> {
            self.bump();
            let mut cards = self.cards.lock().unwrap();
            let before = cards.len();
            cards.retain(|c| c.id != id);
            if cards.len() == before {
                return Err(Self::not_found());
            }
            Ok("Flashcard deleted successfully".to_string())
        }

        async fn increment_review(&self, id: Uuid) -> Result<Flashcard, ClientError> {
            self.bump();
            if self.panic_reviews {
                panic!("review task crashed");
            }
            if self.fail_reviews {
                return Err(ClientError::Timeout(10));
            }
            self.reviewed.lock().unwrap().push(id);
            let mut cards = self.cards.lock().unwrap();
            let card = cards.iter_mut().find(|c| c.id == id).ok_or_else(Self::not_found)?;
            card.review_count += 1;
            card.last_reviewed = Utc::now();
            Ok(card.clone())
        }

        async fn categories(&self) -> Result<Vec<String>, ClientError> {
            self.bump();
            let mut categories: Vec<String> =
                self.cards.lock().unwrap().iter().map(|c| c.category.clone()).collect();
            categories.sort();
            categories.dedup();
            Ok(categories)
        }
    }

    fn three_cards() -> Vec<Flashcard> {
        vec![
            card("a1", "A", Difficulty::Easy, 1),
            card("a2", "A", Difficulty::Hard, 2),
            card("b1", "B", Difficulty::Easy, 3),
        ]
    }

    async fn loaded(api: FakeApi) -> (Arc<FakeApi>, SessionController<FakeApi>) {
        let api = Arc::new(api);
        let mut controller = SessionController::new(Arc::clone(&api));
        controller.load().await.unwrap();
        (api, controller)
    }

    #[tokio::test]
    async fn test_load_fetches_cards_and_categories() {
        let (_, controller) = loaded(FakeApi::with_cards(three_cards())).await;
        assert_eq!(controller.working_set().len(), 3);
        assert_eq!(controller.categories(), ["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_three_card_session_fires_reviews() {
        let cards = three_cards();
        let ids: Vec<Uuid> = cards.iter().map(|c| c.id).collect();
        let (api, mut controller) = loaded(FakeApi::with_cards(cards)).await;

        let first = controller.start_study().unwrap().id;
        assert_eq!(first, ids[0]);
        assert_eq!(controller.study_state(), StudyState::Studying { cursor: 0, side: Side::Front });

        assert_eq!(controller.flip(), StudyState::Studying { cursor: 0, side: Side::Back });
        assert_eq!(controller.flip(), StudyState::Studying { cursor: 0, side: Side::Front });

        let step = controller.next().unwrap();
        assert_eq!(step.state, StudyState::Studying { cursor: 1, side: Side::Front });
        controller.flush_reviews().await;
        assert_eq!(api.reviewed(), vec![ids[0]]);

        controller.next().unwrap();
        assert_eq!(controller.progress(), Some((3, 3)));

        let last = controller.next().unwrap();
        assert!(last.completed());
        assert_eq!(controller.study_state(), StudyState::Idle);
        assert!(controller.current_card().is_none());

        controller.flush_reviews().await;
        let reviewed = api.reviewed();
        assert_eq!(reviewed.len(), 3);
        assert!(ids.iter().all(|id| reviewed.contains(id)));
    }

    #[tokio::test]
    async fn test_start_with_empty_working_set_is_rejected() {
        let (_, mut controller) = loaded(FakeApi::default()).await;
        assert!(matches!(controller.start_study(), Err(SessionError::NothingToStudy)));
        assert_eq!(controller.study_state(), StudyState::Idle);
    }

    #[tokio::test]
    async fn test_idle_flip_and_next_are_noops() {
        let (api, mut controller) = loaded(FakeApi::with_cards(three_cards())).await;
        let before = api.request_count();

        assert_eq!(controller.flip(), StudyState::Idle);
        assert!(controller.next().is_none());
        controller.flush_reviews().await;
        assert_eq!(api.request_count(), before);
    }

    #[tokio::test]
    async fn test_session_studies_filtered_view() {
        let (api, mut controller) = loaded(FakeApi::with_cards(three_cards())).await;
        controller.set_filter(Filter::default().with_category(Some("B".to_string())));

        assert_eq!(controller.start_study().unwrap().question, "b1");
        assert_eq!(controller.progress(), Some((1, 1)));
        assert!(controller.next().unwrap().completed());
        controller.flush_reviews().await;
        assert_eq!(api.reviewed().len(), 1);

        controller.set_filter(Filter::default().with_category(Some("missing".to_string())));
        assert!(matches!(controller.start_study(), Err(SessionError::NothingToStudy)));
    }

    #[tokio::test]
    async fn test_review_failure_does_not_block_advancing() {
        let api = FakeApi {
            fail_reviews: true,
            ..FakeApi::with_cards(three_cards())
        };
        let (_, mut controller) = loaded(api).await;

        controller.start_study().unwrap();
        let step = controller.next().unwrap();
        controller.flush_reviews().await;
        assert_eq!(step.state, StudyState::Studying { cursor: 1, side: Side::Front });
        assert_eq!(controller.current_card().unwrap().question, "a2");
    }

    #[tokio::test]
    async fn test_flush_survives_a_crashed_review_task() {
        let api = FakeApi {
            panic_reviews: true,
            ..FakeApi::with_cards(three_cards())
        };
        let (_, mut controller) = loaded(api).await;

        controller.start_study().unwrap();
        controller.next().unwrap();
        controller.next().unwrap();
        controller.flush_reviews().await;

        assert_eq!(controller.progress(), Some((3, 3)));
        assert!(controller.pending_reviews.is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        let (api, mut controller) = loaded(FakeApi::default()).await;
        let before = api.request_count();

        let result = controller
            .create(CreateFlashcardRequest {
                question: Some("   ".to_string()),
                answer: Some("A".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(api.request_count(), before);
        assert!(controller.working_set().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_reconcile_working_set() {
        let (_, mut controller) = loaded(FakeApi::with_cards(three_cards())).await;

        let created = controller
            .create(CreateFlashcardRequest {
                question: Some("Q".to_string()),
                answer: Some("A".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(controller.working_set().cards()[0].id, created.id);
        assert_eq!(created.category, "General");
        assert!(controller.categories().contains(&"General".to_string()));

        let target = controller.working_set().cards()[2].id;
        let updated = controller
            .update(
                target,
                UpdateFlashcardRequest {
                    question: Some("changed".to_string()),
                    answer: Some("A".to_string()),
                    category: Some("A".to_string()),
                    difficulty: Some("Hard".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(controller.working_set().cards()[2].id, updated.id);
        assert_eq!(controller.working_set().cards()[2].question, "changed");

        controller.delete(created.id).await.unwrap();
        assert!(controller.working_set().get(created.id).is_none());
        assert_eq!(controller.working_set().len(), 3);

        let missing = controller.delete(created.id).await;
        assert!(matches!(missing, Err(ref e) if e.is_not_found()));
        assert_eq!(controller.working_set().len(), 3);
    }
}
