//! # BIOS Module
//!
//! This contains tables and transformations that sit between a file system
//! and the bytes of a disk image.  At present that means sector skews:
//! the `skew` submodule holds the interleave tables and order conversions
//! for Apple 5.25 inch sector images.

pub mod skew;
