//! ### WOZ profile (Applesauce bitstream/flux)

use crate::img::{FormatProfile,FormatType,Error};
use super::{u32_le,clamp_score};

pub const SIGNATURE_WOZ1: u32 = 0x315a4f57; // "WOZ1"
pub const SIGNATURE_WOZ2: u32 = 0x325a4f57; // "WOZ2"
/// FF 0A 0D 0A guard against text-mode mangling
pub const MAGIC: u32 = 0x0a0d0aff;
pub const HEADER_SIZE: usize = 12;
pub const CHUNK_INFO: u32 = 0x4f464e49;
pub const CHUNK_TMAP: u32 = 0x50414d54;
pub const CHUNK_TRKS: u32 = 0x534b5254;

pub struct WozInfo {
    pub version: u8,
    pub disk_type: u8,
    pub write_protected: bool,
    pub has_info: bool,
    pub has_tmap: bool,
    pub has_trks: bool
}

fn detect_version(dat: &[u8]) -> u8 {
    if dat.len() < 8 || u32_le(dat,4) != MAGIC {
        return 0;
    }
    match u32_le(dat,0) {
        SIGNATURE_WOZ1 => 1,
        SIGNATURE_WOZ2 => 2,
        _ => 0
    }
}

/// Walk the chunk list, returning the data offset of the requested id.
fn find_chunk(dat: &[u8],id: u32) -> Option<usize> {
    let mut offset = HEADER_SIZE;
    while offset + 8 <= dat.len() {
        let chunk_id = u32_le(dat,offset);
        let chunk_size = u32_le(dat,offset+4) as usize;
        if chunk_id == id {
            return Some(offset+8);
        }
        offset += 8 + chunk_size;
    }
    None
}

pub struct Woz;

impl FormatProfile for Woz {
    fn what_am_i(&self) -> FormatType {
        FormatType::Woz
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        detect_version(dat) > 0
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if dat.len() < HEADER_SIZE || detect_version(dat) == 0 {
            return 0;
        }
        let mut score = 50;
        if find_chunk(dat,CHUNK_INFO).is_some() {
            score += 20;
        }
        if find_chunk(dat,CHUNK_TMAP).is_some() {
            score += 15;
        }
        if find_chunk(dat,CHUNK_TRKS).is_some() {
            score += 15;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<WozInfo,Error> {
    let version = detect_version(dat);
    if version == 0 {
        return Err(Error::HeaderMismatch);
    }
    let info = find_chunk(dat,CHUNK_INFO);
    let (disk_type,write_protected) = match info {
        Some(offset) if offset + 3 <= dat.len() => (dat[offset+1],dat[offset+2] != 0),
        _ => (0,false)
    };
    Ok(WozInfo {
        version,
        disk_type,
        write_protected,
        has_info: info.is_some(),
        has_tmap: find_chunk(dat,CHUNK_TMAP).is_some(),
        has_trks: find_chunk(dat,CHUNK_TRKS).is_some()
    })
}

/// Fabricate a minimal WOZ2 header with an INFO chunk.
pub fn create_header(disk_type: u8) -> Vec<u8> {
    let mut ans = vec![0;HEADER_SIZE + 8 + 60];
    ans[0..4].copy_from_slice(&u32::to_le_bytes(SIGNATURE_WOZ2));
    ans[4..8].copy_from_slice(&u32::to_le_bytes(MAGIC));
    // crc32 left zero (meaning unchecked)
    ans[12..16].copy_from_slice(&u32::to_le_bytes(CHUNK_INFO));
    ans[16..20].copy_from_slice(&u32::to_le_bytes(60));
    ans[20] = 2; // INFO version
    ans[21] = disk_type;
    ans
}
