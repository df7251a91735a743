use crate::{
    ad::{ad_repository::AdRepository, ad_service::AdService},
    category::{category_repository::CategoryRepository, category_service::CategoryService},
    conversation::{
        conversation_repository::ConversationRepository,
        conversation_service::ConversationService,
    },
    db::DbPool,
    message::{message_models::MessageEvent, message_repository::MessageRepository, message_service::MessageService},
    storage::BlobStore,
    user::user_repository::UserRepository,
};
use anyhow::Context;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub message_tx: broadcast::Sender<MessageEvent>,
    pub category_service: CategoryService,
    pub ad_service: AdService,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
}

impl AppState {
    pub fn new(db: DbPool, config: Arc<Config>, blob_store: Arc<dyn BlobStore>) -> Self {
        let (message_tx, _) = broadcast::channel(100);

        let user_repository = UserRepository::new(db.clone());
        let category_repository = CategoryRepository::new(db.clone());
        let ad_repository = AdRepository::new(db.clone());
        let conversation_repository = ConversationRepository::new(db.clone());
        let message_repository = MessageRepository::new(db.clone());

        let category_service = CategoryService::new(category_repository.clone());
        let ad_service = AdService::new(
            db.clone(),
            ad_repository.clone(),
            category_repository,
            category_service.clone(),
            blob_store,
        );
        let conversation_service = ConversationService::new(
            db.clone(),
            conversation_repository.clone(),
            message_repository.clone(),
            ad_repository,
            user_repository,
        );
        let message_service = MessageService::new(db, message_repository, conversation_repository);

        Self {
            config,
            message_tx,
            category_service,
            ad_service,
            conversation_service,
            message_service,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub storage_root: PathBuf,
    pub seed_categories: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a number")?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            storage_root: std::env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./storage".to_string())
                .into(),
            seed_categories: std::env::var("SEED_CATEGORIES")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
