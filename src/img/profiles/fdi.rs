//! ### FDI profile (Formatted Disk Image)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,clamp_score};

pub const SIGNATURE: &[u8;3] = b"FDI";
pub const HEADER_SIZE: usize = 14;

pub struct FdiInfo {
    pub cylinders: u16,
    pub heads: u16,
    pub write_protected: bool,
    pub data_offset: u16
}

pub struct Fdi;

impl FormatProfile for Fdi {
    fn what_am_i(&self) -> FormatType {
        FormatType::Fdi
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= HEADER_SIZE && &dat[0..3] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        let cylinders = u16_le(dat,4);
        if cylinders >= 1 && cylinders <= 255 {
            score += 15;
        }
        let heads = u16_le(dat,6);
        if heads >= 1 && heads <= 2 {
            score += 15;
        }
        if u16_le(dat,10) as usize >= HEADER_SIZE {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<FdiInfo,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if &dat[0..3] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    Ok(FdiInfo {
        cylinders: u16_le(dat,4),
        heads: u16_le(dat,6),
        write_protected: dat[3] != 0,
        data_offset: u16_le(dat,10)
    })
}
