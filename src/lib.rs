//! henkan - media conversion job pipeline
//!
//! Analyzes input media, infers encoder settings, decides between remux and
//! re-encode, and runs ffmpeg with live progress, one job or a whole batch
//! at a time.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod formats;
pub mod job;
pub mod media;
pub mod output;
pub mod progress;
pub mod settings;
pub mod workflow;

#[cfg(test)]
mod testing;
