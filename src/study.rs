//! Study-session state machine.
//!
//! Transitions are pure functions over `StudyState`; the caller owns the
//! deck and decides what to do with a reviewed card.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    pub fn flipped(self) -> Self {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudyState {
    #[default]
    Idle,
    Studying { cursor: usize, side: Side },
}

/// Result of `Next` while studying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub state: StudyState,
    /// Index of the card that was just finished and should be marked reviewed
    pub reviewed: usize,
}

impl Advance {
    pub fn completed(&self) -> bool {
        self.state == StudyState::Idle
    }
}

impl StudyState {
    /// `None` when there is nothing to study.
    pub fn start(deck_len: usize) -> Option<Self> {
        (deck_len > 0).then_some(StudyState::Studying {
            cursor: 0,
            side: Side::Front,
        })
    }

    pub fn flip(self) -> Self {
        match self {
            StudyState::Idle => StudyState::Idle,
            StudyState::Studying { cursor, side } => StudyState::Studying {
                cursor,
                side: side.flipped(),
            },
        }
    }

    /// `None` while idle.
    pub fn next(self, deck_len: usize) -> Option<Advance> {
        match self {
            StudyState::Idle => None,
            StudyState::Studying { cursor, .. } => {
                let state = if cursor + 1 < deck_len {
                    StudyState::Studying {
                        cursor: cursor + 1,
                        side: Side::Front,
                    }
                } else {
                    StudyState::Idle
                };
                Some(Advance {
                    state,
                    reviewed: cursor,
                })
            }
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        match self {
            StudyState::Idle => None,
            StudyState::Studying { cursor, .. } => Some(*cursor),
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            StudyState::Idle => None,
            StudyState::Studying { side, .. } => Some(*side),
        }
    }

    pub fn is_studying(&self) -> bool {
        matches!(self, StudyState::Studying { .. })
    }
}
