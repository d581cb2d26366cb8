pub mod collector;
pub mod history;
pub mod platform;
pub mod snapshot;
