//! ### ATR profile (Atari 8-bit)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,clamp_score};

pub const MAGIC_LO: u8 = 0x96;
pub const MAGIC_HI: u8 = 0x02;
pub const HEADER_SIZE: usize = 16;
pub const FLAG_PROTECTED: u8 = 0x01;

pub struct AtrInfo {
    pub sector_size: u16,
    pub image_size: u32,
    pub write_protected: bool,
    pub bad_sectors: u16
}

/// image size is stored in 16 byte paragraphs, low word plus a high byte
fn image_size(dat: &[u8]) -> u32 {
    (u16_le(dat,2) as u32 | (dat[6] as u32) << 16) * 16
}

pub struct Atr;

impl FormatProfile for Atr {
    fn what_am_i(&self) -> FormatType {
        FormatType::Atr
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= HEADER_SIZE && dat[0] == MAGIC_LO && dat[1] == MAGIC_HI
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        let sector_size = u16_le(dat,4);
        if sector_size == 128 || sector_size == 256 {
            score += 20;
        }
        let img = image_size(dat) as usize;
        if dat.len() == HEADER_SIZE + img {
            score += 25;
        } else if img >= 256 && dat.len() + 256 >= HEADER_SIZE + img {
            score += 10;
        }
        // the three canonical densities
        if matches!(img,92160 | 133120 | 183936) {
            score += 5;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<AtrInfo,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if dat[0] != MAGIC_LO || dat[1] != MAGIC_HI {
        return Err(Error::HeaderMismatch);
    }
    Ok(AtrInfo {
        sector_size: u16_le(dat,4),
        image_size: image_size(dat),
        write_protected: dat[8] & FLAG_PROTECTED > 0,
        bad_sectors: u16_le(dat,9)
    })
}

/// Fabricate a header for an image of `image_size` bytes.
pub fn create_header(image_size: u32,sector_size: u16) -> Vec<u8> {
    let mut ans = vec![0;HEADER_SIZE];
    ans[0] = MAGIC_LO;
    ans[1] = MAGIC_HI;
    let paragraphs = image_size / 16;
    ans[2..4].copy_from_slice(&u16::to_le_bytes(paragraphs as u16));
    ans[4..6].copy_from_slice(&u16::to_le_bytes(sector_size));
    ans[6] = (paragraphs >> 16) as u8;
    ans
}
