// Common module - shared plumbing used across feature modules

pub mod config;
pub mod error;
pub mod helpers;
pub mod money;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use helpers::safe_email_log;
pub use money::{format_dollars, parse_amount_dollars, Cents};
pub use state::AppState;
