pub mod connection_manager;
pub mod domain;
pub mod infrastructure;
