pub mod account;
pub mod app_config;
pub mod blog;
pub mod db;
pub mod derive;
pub mod error;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod session;
pub mod storage;
pub mod taxonomy;
pub mod web;
