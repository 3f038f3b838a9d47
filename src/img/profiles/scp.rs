//! ### SCP profile (SuperCard Pro flux)

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const SIGNATURE: &[u8;3] = b"SCP";
pub const HEADER_SIZE: usize = 16;
pub const MAX_TRACKS: usize = 168;

pub struct ScpInfo {
    pub version: u8,
    pub disk_type: u8,
    pub revolutions: u8,
    pub start_track: u8,
    pub end_track: u8,
    pub flags: u8,
    pub bit_cell_width: u8,
    pub heads: u8
}

pub struct Scp;

impl FormatProfile for Scp {
    fn what_am_i(&self) -> FormatType {
        FormatType::Scp
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 3 && &dat[0..3] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < HEADER_SIZE || !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        if dat[3] >= 0x10 && dat[3] <= 0x24 {
            score += 15;
        }
        let (start,end) = (dat[6],dat[7]);
        if end >= start && (end - start + 1) as usize <= MAX_TRACKS {
            score += 15;
        }
        if dat[5] >= 1 && dat[5] <= 10 {
            score += 10;
        }
        // the track offset table follows the header
        if dat.len() >= HEADER_SIZE + (end as usize + 1) * 4 {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<ScpInfo,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if &dat[0..3] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    Ok(ScpInfo {
        version: dat[3],
        disk_type: dat[4],
        revolutions: dat[5],
        start_track: dat[6],
        end_track: dat[7],
        flags: dat[8],
        bit_cell_width: dat[9],
        heads: dat[10]
    })
}
