pub mod aggregate;
pub mod atlas;
pub mod errlog;
pub mod fetch;
pub mod table;
