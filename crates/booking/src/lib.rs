pub mod booking;
pub mod calendar;
pub mod config;
mod config_env;
pub mod models;
pub mod repos;
pub mod timezone;
