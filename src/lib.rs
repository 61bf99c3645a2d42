pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod output;
pub mod session;
pub mod utils;

#[cfg(test)]
mod tests;
