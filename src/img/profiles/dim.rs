//! ### DIM profile (Japanese PC sector image)

use crate::img::{FormatProfile,FormatType,Error};
use super::clamp_score;

pub const HEADER_SIZE: usize = 256;
pub const SIGNATURE_POS: usize = 0xab;

/// (media type, cylinders, heads, sectors, sector size, data size)
pub const GEOMETRIES: [(u8,u8,u8,u8,u16,u32);5] = [
    (0x00,77,2, 8,1024,1261568), // 2HD 1.2MB
    (0x02,80,2,15, 512,1228800), // 2HC 1.2MB
    (0x09,80,2,18, 512,1474560), // 2HQ 1.44MB
    (0x11,80,2, 8, 512, 655360), // 2DD 640KB
    (0x19,80,2, 9, 512, 737280)  // 2DD 720KB
];

pub struct DimInfo {
    pub media_type: u8,
    pub cylinders: u8,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub sector_size: u16,
    pub data_size: u32
}

fn geometry(media: u8) -> Option<(u8,u8,u8,u8,u16,u32)> {
    GEOMETRIES.iter().find(|g| g.0 == media).cloned()
}

pub struct Dim;

impl FormatProfile for Dim {
    fn what_am_i(&self) -> FormatType {
        FormatType::Dim
    }
    fn validate_signature(&self,dat: &[u8]) -> bool {
        dat.len() >= HEADER_SIZE && dat[SIGNATURE_POS] == 0x00 && geometry(dat[0]).is_some()
    }
    fn probe(&self,dat: &[u8]) -> u8 {
        if !self.validate_signature(dat) {
            return 0;
        }
        let geom = geometry(dat[0]).unwrap();
        let mut score = 30;
        // media 0x00 is indistinguishable from blank bytes, demand the
        // exact file size before trusting it
        if dat.len() == HEADER_SIZE + geom.5 as usize {
            score += 70;
        } else if dat[0] != 0x00 {
            score += 40;
        } else {
            return 0;
        }
        clamp_score(score)
    }
}

pub fn parse(dat: &[u8]) -> Result<DimInfo,Error> {
    if dat.len() < HEADER_SIZE {
        return Err(Error::TruncatedImage);
    }
    let geom = match dat[SIGNATURE_POS] == 0x00 {
        true => geometry(dat[0]).ok_or(Error::HeaderMismatch)?,
        false => return Err(Error::HeaderMismatch)
    };
    Ok(DimInfo {
        media_type: geom.0,
        cylinders: geom.1,
        heads: geom.2,
        sectors_per_track: geom.3,
        sector_size: geom.4,
        data_size: geom.5
    })
}
