//! ## Sector Skewing Module
//!
//! This contains the sector skew tables.  Sector images are organized in a way
//! where this information is needed to find a sector: the file system addresses
//! a *logical* sector, the image stores it in a *physical* slot, and the active
//! `SectorOrder` selects the permutation between the two.

use std::fmt;
use std::str::FromStr;

/// Translate DOS 3.3 logical sector to physical slot
pub const DOS_LSEC_TO_PSEC: [usize;16] = [0,13,11,9,7,5,3,1,14,12,10,8,6,4,2,15];
/// Translate physical slot to DOS 3.3 logical sector
pub const DOS_PSEC_TO_LSEC: [usize;16] = [0,7,14,6,13,5,12,4,11,3,10,2,9,1,8,15];
/// Translate ProDOS logical sector to physical slot
pub const PRODOS_LSEC_TO_PSEC: [usize;16] = [0,2,4,6,8,10,12,14,1,3,5,7,9,11,13,15];
/// Translate physical slot to ProDOS logical sector
pub const PRODOS_PSEC_TO_LSEC: [usize;16] = [0,8,1,9,2,10,3,11,4,12,5,13,6,14,7,15];
/// Identity table for physically ordered images
pub const PHYSICAL: [usize;16] = [0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15];
/// Physical sector skew used by DOS 3.2 (13 sector disks)
pub const DOS32_LSEC_TO_PSEC: [usize;13] = [0,10,7,4,1,11,8,5,2,12,9,6,3];
/// Inverse of the DOS 3.2 skew
pub const DOS32_PSEC_TO_LSEC: [usize;13] = [0,4,8,12,3,7,11,2,6,10,1,5,9];

/// Enumerates disk image sector orderings.  The value selects the
/// permutation that takes a logical sector number to its slot in the image.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum SectorOrder {
    Dos,
    ProDos,
    Physical,
    Dos32
}

/// Enumerates skew errors.  The `Display` trait will print the equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("sector order not recognized")]
    UnknownOrder,
    #[error("sector count not compatible with this order")]
    SectorCountMismatch,
    #[error("image size is not a whole number of tracks")]
    ImageSizeMismatch
}

impl SectorOrder {
    /// Get the logical-to-physical permutation for this order.
    /// The table length is the sector count the order supports.
    pub fn map(&self) -> &'static [usize] {
        match self {
            Self::Dos => &DOS_LSEC_TO_PSEC,
            Self::ProDos => &PRODOS_LSEC_TO_PSEC,
            Self::Physical => &PHYSICAL,
            Self::Dos32 => &DOS32_LSEC_TO_PSEC
        }
    }
    /// Take a logical sector to its physical slot.  Sector counts outside the
    /// table (e.g. 3.5 inch 32 sector tracks) are passed through unchanged.
    pub fn physical_sector(&self,sector: usize,secs_per_track: usize) -> usize {
        let table = self.map();
        match secs_per_track == table.len() && sector < table.len() {
            true => table[sector],
            false => sector
        }
    }
    /// Get the physical-to-logical permutation, the inverse of `map`.
    pub fn inverse_map(&self) -> &'static [usize] {
        match self {
            Self::Dos => &DOS_PSEC_TO_LSEC,
            Self::ProDos => &PRODOS_PSEC_TO_LSEC,
            Self::Physical => &PHYSICAL,
            Self::Dos32 => &DOS32_PSEC_TO_LSEC
        }
    }
}

impl fmt::Display for SectorOrder {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dos => write!(f,"do"),
            Self::ProDos => write!(f,"po"),
            Self::Physical => write!(f,"physical"),
            Self::Dos32 => write!(f,"d13")
        }
    }
}

impl FromStr for SectorOrder {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "do" | "dsk" | "dos" => Ok(Self::Dos),
            "po" | "prodos" => Ok(Self::ProDos),
            "physical" | "nib" => Ok(Self::Physical),
            "d13" | "dos32" => Ok(Self::Dos32),
            _ => Err(Error::UnknownOrder)
        }
    }
}

/// Rearrange a whole sector image from one ordering to another.
/// For every logical sector `s` the data at slot `from.map()[s]` moves to slot `to.map()[s]`.
/// Only 16 sector orderings can be converted; the image must be a whole number
/// of 4096 byte tracks.  Conversion in place of a DOS image to ProDOS order and
/// back restores the original bytes exactly.
pub fn convert_order(data: &mut [u8],from: SectorOrder,to: SectorOrder) -> Result<(),Error> {
    if from == to {
        return Ok(());
    }
    let from_map = from.map();
    let to_map = to.map();
    if from_map.len() != 16 || to_map.len() != 16 {
        return Err(Error::SectorCountMismatch);
    }
    if data.len() % (16*256) != 0 {
        return Err(Error::ImageSizeMismatch);
    }
    let tracks = data.len() / (16*256);
    let mut track_buf = [0_u8;16*256];
    for trk in 0..tracks {
        let base = trk * 16 * 256;
        track_buf.copy_from_slice(&data[base..base+16*256]);
        for lsec in 0..16 {
            let src = from_map[lsec] * 256;
            let dst = base + to_map[lsec] * 256;
            data[dst..dst+256].copy_from_slice(&track_buf[src..src+256]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverses() {
        for order in [SectorOrder::Dos,SectorOrder::ProDos,SectorOrder::Physical,SectorOrder::Dos32] {
            let fwd = order.map();
            let inv = order.inverse_map();
            for s in 0..fwd.len() {
                assert_eq!(inv[fwd[s]],s);
            }
        }
    }

    #[test]
    fn conversion_is_involution() {
        // fill slot n with byte n so every sector is distinguishable
        let mut buf: Vec<u8> = (0..4096_usize).map(|i| (i/256) as u8).collect();
        let original = buf.clone();
        convert_order(&mut buf,SectorOrder::Dos,SectorOrder::ProDos).expect("convert failed");
        assert_eq!(buf[0..256],original[0..256]);
        assert_eq!(buf[15*256..16*256],original[15*256..16*256]);
        assert_ne!(buf,original);
        // every logical sector must have moved from the DOS slot to the ProDOS slot
        for lsec in 0..16 {
            assert_eq!(buf[PRODOS_LSEC_TO_PSEC[lsec]*256],original[DOS_LSEC_TO_PSEC[lsec]*256]);
        }
        convert_order(&mut buf,SectorOrder::ProDos,SectorOrder::Dos).expect("convert failed");
        assert_eq!(buf,original);
    }
}
