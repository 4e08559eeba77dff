pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod ncbi;
pub mod output;
pub mod store;
pub mod taxonomy;
