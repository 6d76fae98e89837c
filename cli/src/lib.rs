//! `catprint`: convert images and text into packed bitmaps for cat printers.

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod services;

pub use bootstrap::{Foundation, init_foundation};
