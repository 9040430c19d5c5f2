pub mod cache;
pub mod config;
pub mod database;
pub mod redis_store;
pub mod reset_scheduler;
pub mod tenant_cache;
