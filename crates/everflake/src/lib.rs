#![doc = include_str!("../README.md")]

mod assigner;
mod config;
mod error;
mod generator;
mod id;
mod layout;
mod time;

pub use crate::assigner::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::layout::*;
pub use crate::time::*;
