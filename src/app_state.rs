use std::sync::Arc;

use crate::{
    config::Config,
    constants::books::BOOKS,
    db::Database,
    errors::AppResult,
    repositories::{
        LeaderboardRepository, MongoLeaderboardRepository, MongoQuestionRepository,
        MongoThemeRepository, QuestionRepository, ThemeRepository,
    },
    services::{
        assistant_client::{AssistantClient, OpenAiAssistantClient},
        assistant_provisioning::provision_file_search,
        conversation::ConversationRunner,
        leaderboard_service::LeaderboardService,
        mcq_service::McqService,
        question_generator::QuestionGenerator,
        session_registry::SessionRegistry,
        structure_selector::StructureSelector,
        theme_tracker::ThemeTracker,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub mcq_service: Arc<McqService>,
    pub leaderboard_service: Arc<LeaderboardService>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let question_repository = Arc::new(MongoQuestionRepository::new(&db, &config.questions_collection));
        question_repository.ensure_indexes().await?;

        let theme_repository = Arc::new(MongoThemeRepository::new(&db, &config.themes_collection));
        theme_repository.ensure_indexes().await?;

        let leaderboard_repository =
            Arc::new(MongoLeaderboardRepository::new(&db, &config.leaderboard_collection));
        leaderboard_repository.ensure_indexes().await?;

        let client = Arc::new(OpenAiAssistantClient::new(&config)?);
        if let Err(err) = provision_file_search(client.as_ref(), BOOKS).await {
            log::error!("Could not attach book files to the assistant: {}", err);
        }

        let mut state = Self::from_parts(
            config,
            client,
            question_repository,
            theme_repository,
            leaderboard_repository,
        );
        state.db = Some(db);

        Ok(state)
    }

    /// Builds the service graph over the given collaborators. No database
    /// handle is attached.
    pub fn from_parts(
        config: Config,
        client: Arc<dyn AssistantClient>,
        questions: Arc<dyn QuestionRepository>,
        themes: Arc<dyn ThemeRepository>,
        leaderboard: Arc<dyn LeaderboardRepository>,
    ) -> Self {
        let settings = config.generation_settings();
        let runner = Arc::new(ConversationRunner::new(client.clone(), settings.clone()));

        let generator = Arc::new(QuestionGenerator::new(
            Arc::new(SessionRegistry::new(client)),
            runner.clone(),
            Arc::new(ThemeTracker::new(themes, runner)),
            Arc::new(StructureSelector::default()),
            questions.clone(),
            settings,
        ));

        Self {
            mcq_service: Arc::new(McqService::new(generator, questions)),
            leaderboard_service: Arc::new(LeaderboardService::new(leaderboard)),
            db: None,
            config: Arc::new(config),
        }
    }
}
