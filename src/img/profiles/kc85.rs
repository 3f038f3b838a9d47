//! ### KC85 profile (East German KC85/Z1013 disks)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,clamp_score};

/// MicroDOS 80 track double sided D004 geometry
pub const MICRODOS_SIZE: usize = 780*1024;
pub const D004_SIZES: [usize;3] = [200*1024,400*1024,720*1024];
pub const Z1013_SIZES: [usize;2] = [160*1024,320*1024];

pub struct Kc85Info {
    pub microdos: bool,
    pub bytes_per_sector: u16,
    pub sectors_per_track: u8
}

/// MicroDOS banner at offset 3, or a Z80 jump with a plausible BPB
fn is_microdos(dat: &[u8]) -> bool {
    if dat.len() < 16 {
        return false;
    }
    if &dat[3..11] == b"MICRODOS" {
        return true;
    }
    if dat[0] == 0xc3 || dat[0] == 0xe9 {
        let bps = u16_le(dat,11);
        let spt = dat[13];
        if bps == 512 && spt >= 5 && spt <= 18 {
            return true;
        }
    }
    false
}

pub struct Kc85;

impl FormatProfile for Kc85 {
    fn what_am_i(&self) -> FormatType {
        FormatType::Kc85
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        is_microdos(dat)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < 512 {
            return 0;
        }
        let mut score = 0;
        if is_microdos(dat) {
            score += 60;
        }
        if dat.len() == MICRODOS_SIZE {
            score += 20;
        }
        if D004_SIZES.contains(&dat.len()) {
            score += 10;
        }
        if Z1013_SIZES.contains(&dat.len()) {
            score += 10;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<Kc85Info,Error> {
    if dat.len() < 512 {
        return Err(Error::TruncatedImage);
    }
    if !is_microdos(dat) && !D004_SIZES.contains(&dat.len()) && !Z1013_SIZES.contains(&dat.len()) {
        return Err(Error::HeaderMismatch);
    }
    Ok(Kc85Info {
        microdos: is_microdos(dat),
        bytes_per_sector: u16_le(dat,11),
        sectors_per_track: dat[13]
    })
}
