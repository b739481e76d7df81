pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod handler;
pub mod telemetry;
pub mod transport;
pub mod validate;
pub mod ytdlp;

#[cfg(test)]
mod testing;
