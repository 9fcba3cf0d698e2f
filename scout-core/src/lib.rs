pub mod config;
pub mod error;
pub mod error_utils;
pub mod history;
pub mod pacing;
pub mod patterns;
pub mod retry;
pub mod timestamp;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use history::*;
pub use pacing::*;
pub use patterns::*;
pub use retry::*;
pub use types::*;
