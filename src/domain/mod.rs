//! Domain layer - Pure business logic.

pub mod hls;
pub mod jobs;
pub mod layout;
pub mod pipeline;
pub mod quality;
pub mod thumbnail;
pub mod video;
