pub mod activity;
pub mod error;
