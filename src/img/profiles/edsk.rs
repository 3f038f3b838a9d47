//! ### EDSK profile (Amstrad CPC standard and extended DSK)

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const SIGNATURE_STD: &[u8;8] = b"MV - CPC";
pub const SIGNATURE_EXT: &[u8;21] = b"EXTENDED CPC DSK File";
pub const TRACK_SIGNATURE: &[u8;12] = b"Track-Info\r\n";
pub const DISK_INFO_SIZE: usize = 256;
pub const MAX_TRACKS: u8 = 85;

pub struct EdskInfo {
    pub extended: bool,
    pub creator: String,
    pub tracks: u8,
    pub sides: u8
}

fn is_extended(dat: &[u8]) -> bool {
    dat.len() >= SIGNATURE_EXT.len() && &dat[0..SIGNATURE_EXT.len()] == SIGNATURE_EXT
}

fn is_standard(dat: &[u8]) -> bool {
    dat.len() >= 8 && &dat[0..8] == SIGNATURE_STD
}

pub struct Edsk;

impl FormatProfile for Edsk {
    fn what_am_i(&self) -> FormatType {
        FormatType::Edsk
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        is_extended(dat) || is_standard(dat)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < DISK_INFO_SIZE {
            return 0;
        }
        let mut score;
        if is_extended(dat) {
            score = 70;
        } else if is_standard(dat) {
            score = 60;
        } else {
            return 0;
        }
        if dat[0x30] >= 1 && dat[0x30] <= MAX_TRACKS {
            score += 10;
        }
        if dat[0x31] == 1 || dat[0x31] == 2 {
            score += 10;
        }
        if dat.len() >= DISK_INFO_SIZE + TRACK_SIGNATURE.len()
            && &dat[DISK_INFO_SIZE..DISK_INFO_SIZE+TRACK_SIGNATURE.len()] == TRACK_SIGNATURE {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<EdskInfo,Error> {
    if dat.len() < DISK_INFO_SIZE {
        return Err(Error::TruncatedImage);
    }
    if !is_extended(dat) && !is_standard(dat) {
        return Err(Error::HeaderMismatch);
    }
    Ok(EdskInfo {
        extended: is_extended(dat),
        creator: String::from_utf8_lossy(&dat[0x22..0x30]).trim_end_matches('\0').to_string(),
        tracks: dat[0x30],
        sides: dat[0x31]
    })
}
