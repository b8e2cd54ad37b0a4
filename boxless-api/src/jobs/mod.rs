pub mod sync_manager;
pub mod task_queue;
