pub mod config;
pub mod deck;
pub mod events;
pub mod render;
pub mod sys;
