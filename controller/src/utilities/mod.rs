pub mod fleet;
pub mod stop_queue;
