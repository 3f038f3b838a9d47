//! ### TD0 profile (Teledisk)

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const HEADER_SIZE: usize = 12;
/// "TD" = normal, "td" = advanced (LZSS compressed)
pub const SIGNATURE_NORMAL: &[u8;2] = b"TD";
pub const SIGNATURE_ADVANCED: &[u8;2] = b"td";
pub const KNOWN_VERSIONS: [u8;5] = [10,11,15,20,21];

pub struct Td0Info {
    pub advanced_compression: bool,
    pub version: u8,
    pub data_rate: u8,
    pub drive_type: u8,
    pub sides: u8,
    pub has_comment: bool
}

pub struct Td0;

impl FormatProfile for Td0 {
    fn what_am_i(&self) -> FormatType {
        FormatType::Td0
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 2 && (&dat[0..2] == SIGNATURE_NORMAL || &dat[0..2] == SIGNATURE_ADVANCED)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < HEADER_SIZE || !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        if KNOWN_VERSIONS.contains(&dat[4]) {
            score += 15;
        }
        if dat[9] == 1 || dat[9] == 2 {
            score += 10;
        }
        if dat[6] >= 1 && dat[6] <= 6 {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<Td0Info,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if !(&dat[0..2] == SIGNATURE_NORMAL || &dat[0..2] == SIGNATURE_ADVANCED) {
        return Err(Error::HeaderMismatch);
    }
    Ok(Td0Info {
        advanced_compression: &dat[0..2] == SIGNATURE_ADVANCED,
        version: dat[4],
        data_rate: dat[5],
        drive_type: dat[6],
        sides: dat[9],
        has_comment: dat[7] & 0x80 > 0
    })
}
