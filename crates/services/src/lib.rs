pub mod auth;
pub mod cascade;
pub mod error;
pub mod membership;
pub mod trigger;

pub use cascade::{DeletionReport, SubtreeDeleter};
pub use error::{CallableError, ErrorCode};
