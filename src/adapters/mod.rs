//! Adapters - Concrete implementations of ports.

pub mod ffmpeg;
pub mod local;

#[cfg(feature = "s3")]
pub mod aws;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use ffmpeg::FfmpegToolkit;
