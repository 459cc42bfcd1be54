//! Client for the transcode controller.
//!
//! The controller tracks every worker in the fleet. A worker talks to it
//! through two endpoints: a periodic heartbeat (`ping`) and a one-shot
//! report when a job ends (`finish`).

pub mod client;
pub mod error;

pub use client::{ControllerClient, ControllerConfig, FINISH_PATH, PING_PATH};
pub use error::{ControllerError, ControllerResult};
