use std::sync::Arc;

use common::staging::StagingArea;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::service::PostService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub posts: PostService,
    pub staging: StagingArea,
}
