//! ### D88 profile (NEC PC-88/PC-98 sector image)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u16_le,u32_le,clamp_score};

pub const HEADER_SIZE: usize = 688;
pub const TYPE_2D: u8 = 0x00;
pub const TYPE_2DD: u8 = 0x10;
pub const TYPE_2HD: u8 = 0x20;
pub const TYPE_1D: u8 = 0x30;
pub const TYPE_1DD: u8 = 0x40;

pub struct D88Info {
    pub name: String,
    pub write_protect: bool,
    pub disk_type: u8,
    pub disk_size: u32,
    pub first_track_offset: u32
}

fn valid_type(disk_type: u8) -> bool {
    matches!(disk_type,TYPE_2D | TYPE_2DD | TYPE_2HD | TYPE_1D | TYPE_1DD)
}

pub struct D88;

impl FormatProfile for D88 {
    fn what_am_i(&self) -> FormatType {
        FormatType::D88
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        // D88 has no magic; the disk size field is the next best anchor
        dat.len() >= HEADER_SIZE && valid_type(dat[0x1b])
            && u32_le(dat,0x1c) as usize >= HEADER_SIZE
            && u32_le(dat,0x1c) as usize <= dat.len()
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let mut score = 40;
        let first_offset = u32_le(dat,0x20);
        if first_offset == 0 || first_offset as usize == HEADER_SIZE {
            score += 20;
        }
        if dat[0x1a] <= 1 {
            score += 10;
        }
        // sanity of the first sector header
        if dat.len() > HEADER_SIZE + 6 {
            let size_code = dat[HEADER_SIZE+3];
            let sector_count = u16_le(dat,HEADER_SIZE+4);
            if size_code <= 6 && sector_count <= 26 {
                score += 10;
            }
        }
        score += 20; // disk size already vetted by the signature test
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<D88Info,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    if !valid_type(dat[0x1b]) {
        return Err(Error::HeaderMismatch);
    }
    let name_end = dat[0..17].iter().position(|b| *b == 0).unwrap_or(17);
    Ok(D88Info {
        name: String::from_utf8_lossy(&dat[0..name_end]).to_string(),
        write_protect: dat[0x1a] != 0,
        disk_type: dat[0x1b],
        disk_size: u32_le(dat,0x1c),
        first_track_offset: u32_le(dat,0x20)
    })
}

/// Fabricate a bare header (no tracks) the probe will re-identify.
pub fn create_header(name: &str,disk_type: u8) -> Vec<u8> {
    let mut ans = vec![0;HEADER_SIZE];
    let name_len = usize::min(name.len(),16);
    ans[0..name_len].copy_from_slice(&name.as_bytes()[0..name_len]);
    ans[0x1b] = disk_type;
    ans[0x1c..0x20].copy_from_slice(&u32::to_le_bytes(HEADER_SIZE as u32));
    ans
}
