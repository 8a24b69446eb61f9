//! speed-reader-rs: clipboard speed reader with AI bullet summaries.
//!
//! Press the activation key to snapshot the clipboard, Space to flash it one
//! word at a time, and read a short summary when the words run out.

pub mod clipboard;
pub mod config;
pub mod controller;
pub mod hotkey;
pub mod notifier;
pub mod presenter;
pub mod rsvp;
pub mod service;
pub mod settings;
pub mod summarizer;
