pub mod settings_repository;
pub mod task_repository;
