//! ofxio colour - colour-space conversions for the reader/writer pipelines
//!
//! A `ColorConversion` is what the render pipelines see. The concrete
//! `ColorspaceConversion` compiles a `ColorProcessor` once per key and shares
//! it through a process-wide `ProcessorCache` that hosts can purge.

pub mod cache;
pub mod color_space;
pub mod conversion;
pub mod error;
pub mod processor;
pub mod transfer;

pub use cache::{global_cache, ProcessorCache, ProcessorKey};
pub use color_space::ColorSpace;
pub use conversion::{ColorConversion, ColorspaceConversion, IdentityConversion};
pub use error::ColorError;
pub use processor::{ColorOp, ColorProcessor};
pub use transfer::TransferFunction;
