//! Application layer - the pipeline components and the services around them.

pub mod encoder;
pub mod inspector;
pub mod intake;
pub mod maintenance;
pub mod orchestrator;
pub mod publisher;
pub mod reconciler;
pub mod thumbnail;
pub mod worker;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;
