//! Infrastructure adapters for Quietwave
//!
//! Container demuxing and codec decoding live here so the core crate stays
//! free of codec dependencies.

pub mod decode;

pub use decode::SymphoniaDecoder;
