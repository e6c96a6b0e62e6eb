//! Integration test crate for ofxio.
//!
//! Holds the tests that need several crates at once: time mapping through
//! a full reader, the downscaler against iterated halving, and files going
//! from disk through the reader and writer and back.

#[cfg(test)]
mod support;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod properties;

#[cfg(test)]
mod roundtrip;
