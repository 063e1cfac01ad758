pub mod classify;
pub mod engine;
pub mod knowledge;
pub mod store;
