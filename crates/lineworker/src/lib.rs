#![doc = include_str!("../README.md")]

mod buffer;
mod config;
mod error;
mod line;
mod orchestrator;
mod queue;
mod source;

pub use crate::buffer::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::line::*;
pub use crate::orchestrator::*;
pub use crate::queue::*;
pub use crate::source::*;
