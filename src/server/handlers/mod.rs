pub mod ask;
pub mod config;
pub mod health;
pub mod upload;
