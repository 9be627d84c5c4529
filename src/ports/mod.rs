//! Ports - Trait definitions for every external collaborator.

pub mod media;
pub mod progress;
pub mod queue;
pub mod repository;
pub mod storage;
