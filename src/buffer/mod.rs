pub mod buffer_pool_manager;
pub mod error;
pub mod frame;
pub mod page_index;
