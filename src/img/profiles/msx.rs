//! ### MSX profile (raw FAT floppy dump)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,clamp_score};

pub const SECTOR_SIZE: usize = 512;
pub const SIZE_1DD: usize = 368640;
pub const SIZE_2DD: usize = 737280;

pub struct MsxInfo {
    pub media_descriptor: u8,
    pub bytes_per_sector: u16,
    pub total_sectors: u16,
    pub bootable: bool
}

pub struct Msx;

impl FormatProfile for Msx {
    fn what_am_i(&self) -> FormatType {
        FormatType::Msx
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= SECTOR_SIZE && dat[21] >= 0xf8
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < SECTOR_SIZE {
            return 0;
        }
        let mut score = 0;
        if matches!(dat.len(),SIZE_1DD | SIZE_2DD | 184320) {
            score += 25;
        }
        // FAT media descriptor
        if dat[21] >= 0xf8 {
            score += 25;
        }
        if u16_le(dat,11) == 512 {
            score += 15;
        }
        if dat[510] == 0x55 && dat[511] == 0xaa {
            score += 20;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<MsxInfo,Error> {
    if dat.len() < SECTOR_SIZE {
        return Err(Error::TruncatedImage);
    }
    if dat[21] < 0xf8 {
        return Err(Error::HeaderMismatch);
    }
    Ok(MsxInfo {
        media_descriptor: dat[21],
        bytes_per_sector: u16_le(dat,11),
        total_sectors: u16_le(dat,19),
        bootable: dat[510] == 0x55 && dat[511] == 0xaa
    })
}
