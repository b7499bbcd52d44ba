#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

pub mod api;
pub mod build_info;
pub mod codec_pool;
pub mod config;
pub mod db;
pub mod http;
pub mod registry;
pub mod rest;
pub mod session;
pub mod verify;
