#![warn(missing_debug_implementations)]

mod access;
pub mod action;
mod attribute;
mod changes;
mod class_reader;
pub mod class_writer;
mod config;
mod constant_pool;
mod error;
pub mod io;
mod logging;
mod rules;
mod selection;
mod signature;
mod transformer;
mod type_annotation;

pub use access::*;
pub use action::{Action, ActionImpl, ActionRegistry, ActionType};
pub use attribute::*;
pub use changes::*;
pub use class_reader::*;
pub use config::*;
pub use constant_pool::*;
pub use error::*;
pub use io::{ByteData, InputBuffers};
pub use logging::*;
pub use rules::*;
pub use selection::*;
pub use signature::*;
pub use transformer::*;
pub use type_annotation::*;
