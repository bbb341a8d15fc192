pub mod metadata;
pub mod models;
pub mod runner;
