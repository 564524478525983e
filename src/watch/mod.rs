// src/watch/mod.rs

//! File watching: glob matching, path helpers, debouncing and the `notify`
//! backed watcher task.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::Debouncer;
pub use patterns::{MatchedFile, WatchBinding, collect_matching_files};
pub use watcher::{WatcherHandle, WatcherOptions, spawn_watcher};
