//! ### MFI profile (MAME floppy image)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u32_le,clamp_score};

pub const SIGNATURE_V1: &[u8;8] = b"MAMEFLOP";
pub const SIGNATURE_V2: &[u8;4] = b"MFI2";
pub const HEADER_SIZE: usize = 16;

pub struct MfiInfo {
    pub version: u8,
    pub cylinders: u32,
    pub heads: u32
}

fn is_v1(dat: &[u8]) -> bool {
    dat.len() >= HEADER_SIZE && &dat[0..8] == SIGNATURE_V1
}

fn is_v2(dat: &[u8]) -> bool {
    dat.len() >= HEADER_SIZE && &dat[0..4] == SIGNATURE_V2
}

pub struct Mfi;

impl FormatProfile for Mfi {
    fn what_am_i(&self) -> FormatType {
        FormatType::Mfi
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        is_v1(dat) || is_v2(dat)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        let (cylinders,heads) = if is_v1(dat) {
            (u32_le(dat,8),u32_le(dat,12))
        } else if is_v2(dat) {
            (u32_le(dat,4),u32_le(dat,8))
        } else {
            return 0;
        };
        let mut score = 60;
        if cylinders >= 1 && cylinders <= 100 {
            score += 20;
        }
        if heads >= 1 && heads <= 2 {
            score += 20;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<MfiInfo,Error> {
    if is_v1(dat) {
        return Ok(MfiInfo {
            version: 1,
            cylinders: u32_le(dat,8),
            heads: u32_le(dat,12)
        });
    }
    if is_v2(dat) {
        return Ok(MfiInfo {
            version: 2,
            cylinders: u32_le(dat,4),
            heads: u32_le(dat,8)
        });
    }
    Err(Error::HeaderMismatch)
}
