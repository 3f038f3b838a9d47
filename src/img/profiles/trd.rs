//! ### TRD profile (TR-DOS, ZX Spectrum)
//!
//! TRD is headerless; the disk info sector at track 0 sector 9 carries the
//! identification byte.

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const SIGNATURE: u8 = 0x10;
pub const SIGNATURE_POS: usize = 0x8e7;
pub const TYPE_POS: usize = 0x8e3;
pub const SIZE_SSDD: usize = 40*1*16*256;
pub const SIZE_DSDD: usize = 40*2*16*256;
pub const SIZE_DSHD: usize = 80*2*16*256;
pub const KNOWN_TYPES: [u8;4] = [0x16,0x17,0x18,0x19];

pub struct TrdInfo {
    pub disk_type: u8,
    pub file_count: u8,
    pub free_sectors: u16
}

pub struct Trd;

impl FormatProfile for Trd {
    fn what_am_i(&self) -> FormatType {
        FormatType::Trd
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() > SIGNATURE_POS && dat[SIGNATURE_POS] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        let mut score = 0;
        if matches!(dat.len(),SIZE_SSDD | SIZE_DSDD | SIZE_DSHD) {
            score += 30;
        }
        if self.validate_signature(dat) {
            score += 40;
        }
        if dat.len() > TYPE_POS && KNOWN_TYPES.contains(&dat[TYPE_POS]) {
            score += 20;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<TrdInfo,Error> {
    if dat.len() <= SIGNATURE_POS {
        return Err(Error::TruncatedImage);
    }
    if dat[SIGNATURE_POS] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    Ok(TrdInfo {
        disk_type: dat[TYPE_POS],
        file_count: dat[0x8e4],
        free_sectors: u16::from_le_bytes([dat[0x8e5],dat[0x8e6]])
    })
}
