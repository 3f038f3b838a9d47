//! ### 86F profile (86Box surface image)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,clamp_score};

pub const SIGNATURE: &[u8;4] = b"86BF";
pub const FLAG_SIDES_2: u16 = 0x0008;
pub const FLAG_MFM: u16 = 0x0200;

pub struct F86Info {
    pub version: u16,
    pub flags: u16,
    pub sides: u8,
    pub is_mfm: bool
}

pub struct F86;

impl FormatProfile for F86 {
    fn what_am_i(&self) -> FormatType {
        FormatType::F86
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 8 && &dat[0..4] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 60;
        let version = u16_le(dat,4);
        if version >= 0x0100 && version <= 0x0300 {
            score += 20;
        }
        if dat.len() >= 1024 {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<F86Info,Error> {
    if dat.len() < 8 {
        return Err(Error::TruncatedImage);
    }
    if &dat[0..4] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    let flags = u16_le(dat,6);
    Ok(F86Info {
        version: u16_le(dat,4),
        flags,
        sides: match flags & FLAG_SIDES_2 {
            0 => 1,
            _ => 2
        },
        is_mfm: flags & FLAG_MFM > 0
    })
}
