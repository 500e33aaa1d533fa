pub mod cached_question;
pub mod leaderboard_entry;
pub mod question_record;
pub mod theme_set;
pub use cached_question::CachedQuestion;
pub use leaderboard_entry::LeaderboardEntry;
pub use question_record::{OptionLabel, QuestionRecord};
pub use theme_set::ThemeSet;
