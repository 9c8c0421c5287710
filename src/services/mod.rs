pub mod catalog;
pub mod charts;
pub mod dataset_generator;
pub mod dataset_store;
pub mod insert_buffer;
pub mod reports;
pub mod synthesis;
