use uuid::Uuid;

use crate::models::{Difficulty, Flashcard};

/// Optional category/difficulty constraint. An unset field matches every card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    category: Option<String>,
    difficulty: Option<Difficulty>,
}

impl Filter {
    pub fn new(category: Option<String>, difficulty: Option<Difficulty>) -> Self {
        Self::default().with_category(category).with_difficulty(difficulty)
    }

    /// An empty category string clears the constraint.
    pub fn with_category(self, category: Option<String>) -> Self {
        Self {
            category: category.filter(|c| !c.is_empty()),
            ..self
        }
    }

    pub fn with_difficulty(self, difficulty: Option<Difficulty>) -> Self {
        Self { difficulty, ..self }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.difficulty.is_none()
    }

    pub fn matches(&self, card: &Flashcard) -> bool {
        let category_match = self.category.as_deref().is_none_or(|c| card.category == c);
        let difficulty_match = self.difficulty.is_none_or(|d| card.difficulty == d);
        category_match && difficulty_match
    }
}

/// Client-side mirror of the store, newest first as the server delivers it.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    cards: Vec<Flashcard>,
}

impl WorkingSet {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self { cards }
    }

    pub fn replace_all(&mut self, cards: Vec<Flashcard>) {
        self.cards = cards;
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Flashcard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn insert_front(&mut self, card: Flashcard) {
        self.cards.insert(0, card);
    }

    /// Replaces the card with the same id in place. Returns false when the
    /// id is not present, in which case nothing changes.
    pub fn replace(&mut self, card: Flashcard) -> bool {
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => {
                *slot = card;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        self.cards.len() != before
    }

    pub fn filtered(&self, filter: &Filter) -> Vec<&Flashcard> {
        self.cards.iter().filter(|c| filter.matches(c)).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::card;
    use super::*;

    fn sample() -> WorkingSet {
        WorkingSet::new(vec![
            card("a1", "A", Difficulty::Easy, 1),
            card("a2", "A", Difficulty::Hard, 2),
            card("b1", "B", Difficulty::Easy, 3),
        ])
    }

    #[test]
    fn test_filter_by_category_ignores_difficulty() {
        let set = sample();
        let filter = Filter::default().with_category(Some("A".to_string()));
        let questions: Vec<&str> = set.filtered(&filter).iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["a1", "a2"]);
    }

    #[test]
    fn test_filter_by_category_and_difficulty() {
        let set = sample();
        let filter = Filter::new(Some("A".to_string()), Some(Difficulty::Easy));
        let filtered = set.filtered(&filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].question, "a1");
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let set = sample();
        let filter = Filter::new(Some(String::new()), None);
        assert!(filter.is_empty());
        assert_eq!(set.filtered(&filter).len(), 3);

        let by_difficulty = Filter::default().with_difficulty(Some(Difficulty::Easy));
        assert_eq!(set.filtered(&by_difficulty).len(), 2);
    }

    #[test]
    fn test_reconciliation() {
        let mut set = sample();
        let newest = card("new", "C", Difficulty::Medium, 0);
        set.insert_front(newest.clone());
        assert_eq!(set.cards()[0].id, newest.id);

        let mut edited = set.cards()[2].clone();
        edited.question = "edited".to_string();
        assert!(set.replace(edited.clone()));
        assert_eq!(set.cards()[2].question, "edited");
        assert_eq!(set.len(), 4);

        assert!(set.remove(edited.id));
        assert!(set.get(edited.id).is_none());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_reconciling_unknown_id_is_ignored() {
        let mut set = sample();
        let stranger = card("stranger", "Z", Difficulty::Hard, 0);
        assert!(!set.replace(stranger.clone()));
        assert!(!set.remove(stranger.id));
        assert_eq!(set.len(), 3);
    }
}
