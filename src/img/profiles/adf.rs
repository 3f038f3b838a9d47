//! ### ADF profile (Amiga Disk File)
//!
//! ADF has no header; size is the primary signal, the OFS/FFS boot block
//! signature and its checksum the secondary ones.

use crate::img::{FormatProfile,FormatType,Error};
use super::{u32_be,clamp_score};

pub const DD_BYTES: usize = 901120;
pub const HD_BYTES: usize = 1802240;
pub const BOOTBLOCK_SIZE: usize = 1024;

pub struct AdfInfo {
    pub high_density: bool,
    pub dos_type: u8,
    pub bootable: bool
}

fn has_dos_signature(dat: &[u8]) -> bool {
    dat.len() >= 4 && &dat[0..3] == b"DOS" && dat[3] <= 7
}

/// Amiga boot block checksum: u32 big-endian sum with carry wraparound
/// over the first 1024 bytes must come to all ones.
fn verify_bootblock(dat: &[u8]) -> bool {
    if dat.len() < BOOTBLOCK_SIZE {
        return false;
    }
    let mut sum: u32 = 0;
    for i in (0..BOOTBLOCK_SIZE).step_by(4) {
        let (new_sum,carry) = sum.overflowing_add(u32_be(dat,i));
        sum = new_sum + carry as u32;
    }
    sum == u32::MAX
}

pub struct Adf;

impl FormatProfile for Adf {
    fn what_am_i(&self) -> FormatType {
        FormatType::Adf
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        has_dos_signature(dat)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        let mut score;
        if dat.len() == DD_BYTES || dat.len() == HD_BYTES {
            score = 40;
        } else if dat.len() >= DD_BYTES - 1024 && dat.len() <= DD_BYTES + 1024 {
            score = 20;
        } else if dat.len() >= HD_BYTES - 1024 && dat.len() <= HD_BYTES + 1024 {
            score = 20;
        } else {
            return 0;
        }
        if has_dos_signature(dat) {
            score += 30;
            score += 10; // dos type byte vetted by the signature test
            if verify_bootblock(dat) {
                score += 15;
            }
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<AdfInfo,Error> {
    if dat.len() < BOOTBLOCK_SIZE {
        return Err(Error::TruncatedImage);
    }
    if !has_dos_signature(dat) {
        return Err(Error::HeaderMismatch);
    }
    Ok(AdfInfo {
        high_density: dat.len() > DD_BYTES + 1024,
        dos_type: dat[3],
        bootable: verify_bootblock(dat)
    })
}
