pub mod model_runner_manager;
pub mod output_scraper;
