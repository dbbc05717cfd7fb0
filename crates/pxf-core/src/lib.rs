//! Core routines shared by the `pxf` family of crates
//!
//! This crate provides the plumbing that both the container codec (`pxf`)
//! and the JPEG front end (`pxf-jpeg`) need but that belongs to neither:
//!
//! - A byte stream reader and writer with endian-aware reads and writes
//! - A CRC-32 (IEEE 802.3) implementation used by the frame trailer
//!
//! It is `std`-only; none of the crates in this workspace target
//! constrained or `no_std` environments.

pub mod bytestream;
pub mod crc32;
