// ABOUTME: Handler implementations, grouped by resource — the "what" half of routes/ vs routing/

pub mod crawlers;
pub mod scheduler;
pub mod tasks;
