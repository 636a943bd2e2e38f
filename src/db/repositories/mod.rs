pub mod event_repository;
pub mod participation_repository;
pub mod user_repository;

pub use event_repository::*;
pub use participation_repository::*;
pub use user_repository::*;
