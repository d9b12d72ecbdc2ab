pub mod api;
pub mod db;
pub mod ipc;
pub mod model;
pub mod queue;
pub mod session;
