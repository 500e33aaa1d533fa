pub mod leaderboard_repository;
pub mod question_repository;
pub mod theme_repository;

pub use leaderboard_repository::{LeaderboardRepository, MongoLeaderboardRepository};
pub use question_repository::{MongoQuestionRepository, QuestionFilter, QuestionRepository};
pub use theme_repository::{MongoThemeRepository, ThemeRepository};
