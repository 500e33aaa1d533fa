use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReplaceOptions},
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::ThemeSet};

#[async_trait]
pub trait ThemeRepository: Send + Sync {
    async fn find(&self, category: &str, chapter: &str) -> AppResult<Option<ThemeSet>>;
    async fn save(&self, theme_set: ThemeSet) -> AppResult<ThemeSet>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoThemeRepository {
    collection: Collection<ThemeSet>,
}

impl MongoThemeRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }
}

#[async_trait]
impl ThemeRepository for MongoThemeRepository {
    async fn find(&self, category: &str, chapter: &str) -> AppResult<Option<ThemeSet>> {
        let theme_set = self
            .collection
            .find_one(doc! { "category": category, "chapter": chapter })
            .await?;
        Ok(theme_set)
    }

    async fn save(&self, theme_set: ThemeSet) -> AppResult<ThemeSet> {
        let filter = doc! {
            "category": theme_set.category.as_str(),
            "chapter": theme_set.chapter.as_str(),
        };
        let options = ReplaceOptions::builder().upsert(true).build();

        self.collection
            .replace_one(filter, &theme_set)
            .with_options(options)
            .await?;

        Ok(theme_set)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let options = IndexOptions::builder()
            .unique(true)
            .name("category_chapter_unique".to_string())
            .build();
        let model = IndexModel::builder()
            .keys(doc! { "category": 1, "chapter": 1 })
            .options(options)
            .build();

        self.collection.create_index(model).await?;
        log::info!("Created unique index on themes.(category, chapter)");

        Ok(())
    }
}
