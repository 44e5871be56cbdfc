pub mod actor;
pub mod board;
pub mod collection;
