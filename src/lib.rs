pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    dispatch_service::DispatchService, match_service::MatchService,
    reply_service::ReplyService, request_service::RequestService,
    sms_gateway::ClickatellClient,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub match_service: MatchService,
    pub request_service: RequestService,
    pub dispatch_service: DispatchService,
    pub reply_service: ReplyService,
    pub sms_gateway: ClickatellClient,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self> {
        let match_service = MatchService::new(pool.clone());
        let request_service = RequestService::new(pool.clone(), config.request_code_length);
        let dispatch_service = DispatchService::new(pool.clone());
        let reply_service = ReplyService::new(
            pool.clone(),
            config.reply_window_hours,
            config.reference_timezone,
        );
        let sms_gateway = ClickatellClient::new(
            config.clickatell_api_url.clone(),
            config.clickatell_api_key.clone(),
        )?;

        Ok(Self {
            pool,
            match_service,
            request_service,
            dispatch_service,
            reply_service,
            sms_gateway,
        })
    }
}
