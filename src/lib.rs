//! # `fluxkit` main library
//!
//! This library manipulates vintage floppy disk images, with emphasis on preservation
//! workflows.  Operations range from raw flux captures up to file system commands.
//!
//! ## Architecture
//!
//! The library is organized around three layers:
//! * `img` identifies the container format of a byte stream, it does not interpret file systems
//! * `fs` imposes an Apple file system (DOS 3.x or ProDOS) on a sector image
//! * `flux` aligns and merges raw flux captures, it knows nothing of containers or file systems
//!
//! When a `fs::Disk` is created it takes ownership of the image bytes.
//! It then uses this owned buffer as storage.  Any changes are not permanent until the
//! buffer is saved to whatever file system is hosting fluxkit.
//!
//! ## Format Detection
//!
//! The `img` module holds a registry of twenty-six disk image container formats.
//! Each format exposes a stateless probe that scores a byte slice from 0 to 100.
//! The registry ranks the scores and returns the best candidates.  As of this writing
//! the registry covers
//! * Flux captures: WOZ, A2R, SCP, KryoFlux, MFI, 86F, STX, IPF
//! * Bitstreams: HFE, G64, NIB
//! * Sector images: DC42, D88, D77, IMD, TD0, ADF, EDSK, FDI, DIM, ATR, TRD, KC85
//! * Raw dumps: DSK, ST, MSX
//!
//! ## File Systems
//!
//! In order to manipulate files, `fluxkit` must understand the file system it finds on
//! the disk image.  As of this writing `fluxkit` supports
//! * DOS 3.2 and DOS 3.3
//! * ProDOS
//!
//! ## Flux Captures
//!
//! The `flux` module consumes already-sampled flux intervals.  It infers or accepts
//! index pulses, segments the stream into disk revolutions, scores each revolution,
//! and merges multiple decoded revolutions into one bit stream with per-bit voting
//! and weak bit detection.

pub mod bios;
pub mod fs;
pub mod img;
pub mod flux;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Convert bytes to an ASCII string, escaping non-printable bytes as hex, e.g. `\xa0`.
/// If `high_bits` is set, bit 7 is cleared from every byte before interpretation.
pub fn escaped_ascii_from_bytes(bytes: &[u8],high_bits: bool) -> String {
    let mut ans = String::new();
    for raw in bytes {
        let byte = match high_bits {
            true => raw & 0x7f,
            false => *raw
        };
        if byte >= 0x20 && byte < 0x7f {
            ans.push(byte as char);
        } else {
            ans += &format!("\\x{:02x}",byte);
        }
    }
    ans
}
