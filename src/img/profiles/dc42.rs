//! ### DC42 profile (Apple DiskCopy 4.2)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_be,u32_be,clamp_score};

pub const MAGIC: u16 = 0x0100;
pub const HEADER_SIZE: usize = 84;
pub const MAX_NAME_LEN: usize = 63;
pub const SIZE_400K: u32 = 409600;
pub const SIZE_800K: u32 = 819200;
pub const SIZE_1440K: u32 = 1474560;
pub const ENCODING_GCR: u8 = 0x12;
pub const ENCODING_MFM: u8 = 0x22;

pub struct Dc42Info {
    pub name: String,
    pub data_size: u32,
    pub tag_size: u32,
    pub data_checksum: u32,
    pub tag_checksum: u32,
    pub disk_format: u8,
    pub encoding: u8
}

pub struct Dc42;

impl FormatProfile for Dc42 {
    fn what_am_i(&self) -> FormatType {
        FormatType::Dc42
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= HEADER_SIZE && u16_be(dat,82) == MAGIC
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 50;
        if dat[0] as usize <= MAX_NAME_LEN {
            score += 10;
        }
        let data_size = u32_be(dat,64);
        if data_size == SIZE_400K || data_size == SIZE_800K || data_size == SIZE_1440K {
            score += 20;
        }
        let tag_size = u32_be(dat,68);
        let expected = HEADER_SIZE + data_size as usize + tag_size as usize;
        if dat.len() >= expected && dat.len() <= expected + 16 {
            score += 15;
        }
        if dat[80] <= 0x02 {
            score += 5;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<Dc42Info,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if u16_be(dat,82) != MAGIC {
        return Err(Error::HeaderMismatch);
    }
    let name_len = usize::min(dat[0] as usize,MAX_NAME_LEN);
    Ok(Dc42Info {
        name: String::from_utf8_lossy(&dat[1..1+name_len]).to_string(),
        data_size: u32_be(dat,64),
        tag_size: u32_be(dat,68),
        data_checksum: u32_be(dat,72),
        tag_checksum: u32_be(dat,76),
        disk_format: dat[80],
        encoding: dat[81]
    })
}

/// Fabricate a header the probe will re-identify.  `disk_format` 0/1/2
/// select 400K GCR, 800K GCR, 1440K MFM.
pub fn create_header(name: &str,data_size: u32,tag_size: u32,disk_format: u8) -> Vec<u8> {
    let mut ans = vec![0;HEADER_SIZE];
    let name_len = usize::min(name.len(),MAX_NAME_LEN);
    ans[0] = name_len as u8;
    ans[1..1+name_len].copy_from_slice(&name.as_bytes()[0..name_len]);
    ans[64..68].copy_from_slice(&u32::to_be_bytes(data_size));
    ans[68..72].copy_from_slice(&u32::to_be_bytes(tag_size));
    ans[80] = disk_format;
    ans[81] = match disk_format {
        0x02 => ENCODING_MFM,
        _ => ENCODING_GCR
    };
    ans[82..84].copy_from_slice(&u16::to_be_bytes(MAGIC));
    ans
}
