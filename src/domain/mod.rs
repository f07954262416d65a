pub mod error;
pub mod mapper;
pub mod models;
pub mod settings;
