pub mod app;
pub mod protocol;
