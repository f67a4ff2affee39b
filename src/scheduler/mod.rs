//! Adaptive quiz scheduling.
//!
//! The pure steps (eligibility, mastery detection, cache planning, card
//! selection) take plain data and never touch storage. `service` wires them
//! to a `QuizStore`.

pub mod cache;
pub mod eligibility;
pub mod mastery;
pub mod selection;
pub mod service;
pub mod store;

pub use cache::{plan_mastery_merges, MasteryMerge};
pub use eligibility::{eligible_pool, included_deck_ids, Eligibility};
pub use mastery::{detect_newly_mastered, review_cutoff, MasteryPolicy};
pub use selection::{calculate_performance, rank_worst_performers, select_quiz_cards, CardPerformance, Selection};
pub use service::{AccountLocks, QuizError, QuizOutcome, QuizService};
pub use store::{QuizStore, StoreError, StoreResult};
