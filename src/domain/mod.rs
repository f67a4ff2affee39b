pub mod account;
pub mod answer;
pub mod card;
pub mod quiz;

pub use account::{AccountDeck, AccountSettings, SettingsError, SettingsUpdate};
pub use answer::{AnswerRecord, NewAnswer};
pub use card::Card;
pub use quiz::{NewQuiz, QuizResultItem, QuizResults, QuizSession, QuizState, SessionError};
