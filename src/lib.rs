pub mod app;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pix;
pub mod services;
pub mod storage;
pub mod utils;
