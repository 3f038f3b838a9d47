//! ### STX profile (Pasti, Atari ST)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,u32_le,clamp_score};

pub const SIGNATURE: &[u8;3] = b"RSY";
pub const HEADER_SIZE: usize = 16;
pub const TRACK_HEADER_SIZE: usize = 16;

pub struct StxInfo {
    pub version: u16,
    pub track_count: u8,
    pub revision: u8
}

pub struct Stx;

impl FormatProfile for Stx {
    fn what_am_i(&self) -> FormatType {
        FormatType::Stx
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 4 && &dat[0..3] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < HEADER_SIZE || !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 60;
        if u16_le(dat,4) == 3 {
            score += 20;
        }
        if dat[10] >= 1 && dat[10] <= 168 {
            score += 10;
        }
        if dat.len() >= HEADER_SIZE + TRACK_HEADER_SIZE {
            let track_size = u32_le(dat,HEADER_SIZE) as usize;
            if track_size >= TRACK_HEADER_SIZE && track_size < 100_000 {
                score += 10;
            }
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<StxInfo,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if &dat[0..3] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    Ok(StxInfo {
        version: u16_le(dat,4),
        track_count: dat[10],
        revision: dat[11]
    })
}
