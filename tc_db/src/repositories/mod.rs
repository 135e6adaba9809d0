//! ABOUTME: Repository implementations for the orchestrator's domain and scheduler stores
//! ABOUTME: Each module owns one table's CRUD, validation, and domain queries

pub mod crawlers;
pub mod scheduled_jobs;
pub mod task_history;
pub mod tasks;
