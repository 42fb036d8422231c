pub mod analyzer;
pub mod api;
pub mod assistant;
pub mod chat;
pub mod config;
pub mod data_models;
pub mod db;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod openai;
pub mod pagination;
pub mod recipes;
pub mod reconciler;
pub mod search;
pub mod search_engine;
pub mod session;
pub mod state;
pub mod store;
