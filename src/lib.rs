pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod git;
pub mod host;
pub mod infrastructure;
pub mod ui;
