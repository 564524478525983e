// src/server/mod.rs

//! Local dev server and the reload signals it relays to browsers.

pub mod http;
pub mod hub;

pub use http::{DevServer, LONG_POLL_TIMEOUT, RELOAD_ENDPOINT};
pub use hub::{NoopSink, ReloadHub, ReloadSignal, ReloadSink, SignalKind};
