//! ofxio reader - the format independent half of an image reader plugin
//!
//! `GenericReader` owns the parameters, maps host time onto the file
//! sequence, picks full resolution or proxy files and turns decoded pixels
//! into what the host asked for. A `ReaderBackend` supplies the format.

pub mod backend;
pub mod reader;
pub mod render;
pub mod settings;
pub mod source;

#[cfg(test)]
mod test_support;

pub use backend::{DecodeRequest, FrameInfo, ReaderBackend};
pub use reader::{output_premultiplication, ClipPreferences, GenericReader};
pub use render::{OutputPlane, RenderArgs};
pub use settings::{names, ProxyConfig, ReaderSettings};
pub use source::ReaderClip;
