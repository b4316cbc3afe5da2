pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    anti_cheat_service::{AntiCheatService, BanPolicy},
    assignment_service::AssignmentService,
    photo_service::PhotoService,
    session_service::SessionService,
};
use crate::utils::time::Clock;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_service: SessionService,
    pub anti_cheat_service: AntiCheatService,
    pub assignment_service: AssignmentService,
    pub photo_service: PhotoService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Clock::system())
    }

    pub fn with_clock(pool: PgPool, clock: Clock) -> Self {
        let config = crate::config::get_config();

        let session_service = SessionService::new(pool.clone(), clock.clone());
        let anti_cheat_service = AntiCheatService::new(
            pool.clone(),
            clock.clone(),
            BanPolicy::new(config.ban_policy()),
        );
        let assignment_service = AssignmentService::new(pool.clone(), clock.clone());
        let photo_service = PhotoService::new(pool.clone(), clock, config.uploads_dir.clone());

        Self {
            pool,
            session_service,
            anti_cheat_service,
            assignment_service,
            photo_service,
        }
    }
}
