//! ### DSK profile (raw CP/M and Apple II sector dumps)
//!
//! DSK is headerless, so the probe leans on the catalog of known sizes and,
//! for the Apple 140K size, on file system signatures inside the image.

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const SIZE_APPLE_140K: usize = 143360;
/// sizes with a known platform geometry
pub const KNOWN_SIZES: [usize;9] = [92160,102400,116480,143360,163840,204800,256256,409600,512512];

pub struct DskInfo {
    pub apple_dos: bool,
    pub prodos: bool,
    pub boot_jump: bool
}

/// plausible DOS 3.3 VTOC at track 17 sector 0 of a DOS ordered image
fn is_apple_dos(dat: &[u8]) -> bool {
    if dat.len() < SIZE_APPLE_140K {
        return false;
    }
    let v = 17 * 16 * 256;
    dat[v+1] >= 1 && dat[v+1] <= 40
        && dat[v+2] >= 1 && dat[v+2] <= 15
        && matches!(dat[v+0x35],13|16)
        && matches!(dat[v+0x34],35|40)
}

/// plausible ProDOS volume directory key at block 2
fn is_prodos(dat: &[u8]) -> bool {
    if dat.len() < SIZE_APPLE_140K {
        return false;
    }
    let b = 2 * 512;
    dat[b] == 0 && dat[b+1] == 0
        && dat[b+4] >> 4 == 0x0f
        && dat[b+4] & 0x0f > 0
        && dat[b+0x23] == 39
        && dat[b+0x24] == 13
}

pub struct Dsk;

impl FormatProfile for Dsk {
    fn what_am_i(&self) -> FormatType {
        FormatType::Dsk
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        KNOWN_SIZES.contains(&dat.len())
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < 1024 {
            return 0;
        }
        let mut score = 0;
        if KNOWN_SIZES.contains(&dat.len()) {
            score += 30;
        }
        if dat.len() == SIZE_APPLE_140K && (is_apple_dos(dat) || is_prodos(dat)) {
            score += 50;
        }
        // 8080/Z80 jump opens many CP/M boot sectors
        if matches!(dat[0],0xc3 | 0xeb | 0xe9) {
            score += 15;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<DskInfo,Error> {
    if dat.len() < 1024 {
        return Err(Error::TruncatedImage);
    }
    Ok(DskInfo {
        apple_dos: is_apple_dos(dat),
        prodos: is_prodos(dat),
        boot_jump: matches!(dat[0],0xc3 | 0xeb | 0xe9)
    })
}
