pub mod config;
pub mod errors;
pub mod export;
pub mod forecast;
pub mod models;
pub mod pricing;
pub mod sample_data;
pub mod types;
