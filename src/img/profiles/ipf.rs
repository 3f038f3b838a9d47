//! ### IPF profile (SPS/CAPS Interchangeable Preservation Format)
//!
//! IPF files are a chain of big-endian records; the first is CAPS, the
//! second INFO.

use crate::img::{FormatProfile,FormatType,Error};
use super::{u32_be,clamp_score};

pub const RECORD_HEADER_SIZE: usize = 12;
pub const RECORD_CAPS: u32 = 0x43415053;
pub const RECORD_INFO: u32 = 0x494e464f;

pub struct IpfInfo {
    pub caps_length: u32,
    pub has_info: bool
}

pub struct Ipf;

impl FormatProfile for Ipf {
    fn what_am_i(&self) -> FormatType {
        FormatType::Ipf
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 4 && u32_be(dat,0) == RECORD_CAPS
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < RECORD_HEADER_SIZE || !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 60;
        let length = u32_be(dat,4) as usize;
        if length >= RECORD_HEADER_SIZE && length < dat.len() {
            score += 15;
            if length + RECORD_HEADER_SIZE <= dat.len() && u32_be(dat,length) == RECORD_INFO {
                score += 25;
            }
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<IpfInfo,Error> {
    if dat.len() < RECORD_HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if u32_be(dat,0) != RECORD_CAPS {
        return Err(Error::HeaderMismatch);
    }
    let length = u32_be(dat,4);
    Ok(IpfInfo {
        caps_length: length,
        has_info: (length as usize) < dat.len()
            && length as usize + 4 <= dat.len()
            && u32_be(dat,length as usize) == RECORD_INFO
    })
}
