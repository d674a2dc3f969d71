#![forbid(unsafe_code)]

// streamwatch library - launches streaming load tests and tracks every session live

pub mod channel;
pub mod config;
pub mod controller;
pub mod launcher;
pub mod metrics;
pub mod protocol;
pub mod report;
pub mod session;
pub mod validate;
pub mod view;
