pub mod planning_service;
pub mod schedule_optimizer;
pub mod schedule_utils;
pub mod settings_service;
pub mod task_service;
