//! HTTP Handlers

mod ping;
mod webhook;

pub use ping::*;
pub use webhook::*;
