//! ### IMD profile (ImageDisk)

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const SIGNATURE: &[u8;4] = b"IMD ";
pub const HEADER_END: u8 = 0x1a;

pub struct ImdInfo {
    /// the human readable banner, e.g. "IMD 1.18: 21/03/2012 18:32:26"
    pub banner: String
}

pub struct Imd;

impl FormatProfile for Imd {
    fn what_am_i(&self) -> FormatType {
        FormatType::Imd
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 4 && &dat[0..4] == SIGNATURE
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < 32 || !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        // version stamp "IMD x.xx:"
        if dat[5] == b'.' && dat[8] == b':' {
            score += 20;
        }
        // date "dd/mm/yyyy"
        if dat[12] == b'/' && dat[15] == b'/' {
            score += 15;
        }
        // time "hh:mm:ss"
        if dat.len() >= 27 && dat[23] == b':' && dat[26] == b':' {
            score += 10;
        }
        // the comment terminator
        let end = usize::min(dat.len(),1024);
        if dat[30..end].contains(&HEADER_END) {
            score += 5;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<ImdInfo,Error> {
    if dat.len() < 32 {
        return Err(Error::TruncatedImage);
    }
    if &dat[0..4] != SIGNATURE {
        return Err(Error::HeaderMismatch);
    }
    let end = usize::min(dat.len(),1024);
    let banner_end = dat[0..end].iter().position(|b| *b == HEADER_END).unwrap_or(end);
    Ok(ImdInfo {
        banner: String::from_utf8_lossy(&dat[0..banner_end]).to_string()
    })
}
