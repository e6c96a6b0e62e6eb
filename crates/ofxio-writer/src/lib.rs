//! ofxio writer - the format independent half of an image writer plugin
//!
//! `GenericWriter` fetches the planes to write from the host, converts them
//! to the file's colour space and premultiplication, packs the enabled
//! channels and hands one or several parts to a `WriterBackend`.

pub mod backend;
pub mod compositor;
pub mod settings;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use backend::{channel_names, EncodeRequest, EncodeSession, PartInfo, WriterBackend};
pub use compositor::{Part, PartsSplitting, PlaneCompositor, PlaneData, PreparedPlane};
pub use settings::{names, FrameRangeChoice, ViewSelection, WriterSettings};
pub use writer::{GenericWriter, WriteArgs};
