pub mod actor;
pub mod pagination;
