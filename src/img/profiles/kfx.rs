//! ### KryoFlux raw stream profile
//!
//! KryoFlux streams have no leading magic; identification hangs on the
//! out-of-band blocks scattered through the stream.

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const OOB_MARKER: u8 = 0x0d;
pub const OOB_STREAM_INFO: u8 = 0x01;
pub const OOB_INDEX: u8 = 0x02;
pub const OOB_STREAM_END: u8 = 0x03;
pub const OOB_INFO: u8 = 0x04;
pub const OOB_EOF: u8 = 0x0d;
/// sample clock in Hz (24.027 MHz master over 5)
pub const SAMPLE_CLOCK: f64 = 24027428.0 / 5.0;

pub struct KfxInfo {
    pub oob_blocks: usize,
    pub has_info: bool,
    pub has_index: bool
}

pub struct Kfx;

impl FormatProfile for Kfx {
    fn what_am_i(&self) -> FormatType {
        FormatType::Kfx
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= 16 && dat.contains(&OOB_MARKER)
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < 16 {
            return 0;
        }
        let mut score = 0;
        let mut found_oob = false;
        let mut found_info = false;
        for i in 0..dat.len().saturating_sub(3) {
            if dat[i] != OOB_MARKER {
                continue;
            }
            found_oob = true;
            let oob_type = dat[i+1];
            if oob_type == OOB_INFO {
                found_info = true;
            } else if matches!(oob_type,OOB_STREAM_INFO | OOB_INDEX | OOB_STREAM_END) {
                score += 10;
            }
            if oob_type == OOB_EOF {
                score += 20;
                break;
            }
        }
        if found_oob {
            score += 30;
        }
        if found_info {
            score += 30;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<KfxInfo,Error> {
    if dat.len() < 16 {
        return Err(Error::TruncatedImage);
    }
    let mut info = KfxInfo {
        oob_blocks: 0,
        has_info: false,
        has_index: false
    };
    for i in 0..dat.len().saturating_sub(3) {
        if dat[i] != OOB_MARKER {
            continue;
        }
        info.oob_blocks += 1;
        match dat[i+1] {
            OOB_INFO => info.has_info = true,
            OOB_INDEX => info.has_index = true,
            OOB_EOF => break,
            _ => {}
        }
    }
    match info.oob_blocks {
        0 => Err(Error::HeaderMismatch),
        _ => Ok(info)
    }
}
