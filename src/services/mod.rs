pub mod assistant_client;
pub mod assistant_provisioning;
pub mod conversation;
pub mod conversation_locks;
pub mod leaderboard_service;
pub mod mcq_service;
pub mod question_generator;
pub mod record_validator;
pub mod response_parser;
pub mod session_registry;
pub mod structure_selector;
pub mod theme_tracker;

pub use assistant_client::{AssistantClient, OpenAiAssistantClient, Run, RunStatus};
pub use leaderboard_service::LeaderboardService;
pub use mcq_service::McqService;
pub use question_generator::{GenerationRequest, QuestionGenerator};
