pub mod config;
pub mod db;
pub mod model;
pub mod queue;
pub mod server;
pub mod validate;
pub mod worker;
