//! ofxio host - the collaborators the plugins are given by the host.
//!
//! Nothing here implements a plugin ABI; these are the capabilities the
//! reader and writer consume: named parameters, clip images, persistent
//! messages, status codes, host capabilities, filesystem queries and
//! versioned settings files.

pub mod capabilities;
pub mod error;
pub mod fs;
pub mod image;
pub mod message;
pub mod params;
pub mod settings_file;
pub mod status;

pub use capabilities::HostCapabilities;
pub use error::ParamError;
pub use fs::{FileSystem, MemoryFileSystem, StdFileSystem};
pub use image::{HostImage, ImageSource, PlaneSpec, COLOR_PLANE};
pub use message::{MessageLevel, PersistentMessage};
pub use params::{choice_of, from_choice, optional, ChangeReason, ParamSet, ParamValue};
pub use settings_file::SettingsFile;
pub use status::OfxStatus;
