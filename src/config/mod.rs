pub mod config;
pub mod startup_delay;
