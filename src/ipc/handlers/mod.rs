pub mod core;
pub mod defaults;
pub mod lists;
pub mod queue;
pub mod session;
