pub mod command_runner;
pub mod docker_repository;
