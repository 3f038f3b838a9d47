//! ### ProDOS directory structures
//!
//! Fixed 39 byte entries packed and unpacked with explicit offsets.
//! The header entry of a directory key block uses the same 39 byte span
//! but reinterprets the tail fields, so it gets its own structures.

use chrono::{Datelike,Timelike};
use log::warn;
use regex::Regex;
use super::types::*;

/// Pack a datetime into the ProDOS four byte form,
/// date = YYYYYYYMMMMDDDDD, time = 000HHHHH00MMMMMM.
pub fn pack_time(time: Option<chrono::NaiveDateTime>) -> [u8;4] {
    let now = match time {
        Some(t) => t,
        _ => chrono::Local::now().naive_local()
    };
    let (_is_common_era,year) = now.year_ce();
    let packed_date = (now.day() + (now.month() << 5) + (year%100 << 9)) as u16;
    let packed_time = (now.minute() + (now.hour() << 8)) as u16;
    let bytes_date = u16::to_le_bytes(packed_date);
    let bytes_time = u16::to_le_bytes(packed_time);
    [bytes_date[0],bytes_date[1],bytes_time[0],bytes_time[1]]
}

/// Unpack the ProDOS datetime.  Two digit years 78-99 are taken as
/// 1978-1999, 00-77 as 2000-2077; the scheme fails after 2077.
pub fn unpack_time(prodos_date_time: [u8;4]) -> Option<chrono::NaiveDateTime> {
    let date = u16::from_le_bytes([prodos_date_time[0],prodos_date_time[1]]);
    let time = u16::from_le_bytes([prodos_date_time[2],prodos_date_time[3]]);
    let yearmod100 = date >> 9;
    let year = match yearmod100 < 78 {
        true => 2000 + yearmod100,
        false => 1900 + yearmod100
    };
    let month = (date >> 5) & 15;
    let day = date & 31;
    let hour = (time >> 8) & 255;
    let minute = time & 255;
    match chrono::NaiveDate::from_ymd_opt(year as i32,month as u32,day as u32) {
        Some(d) => d.and_hms_opt(hour as u32,minute as u32,0),
        None => None
    }
}

/// Test the string for validity as a ProDOS name: a letter followed by
/// up to 14 letters, digits, or periods.
pub fn is_name_valid(s: &str) -> bool {
    let fname_patt = Regex::new(r"^[A-Z][A-Z0-9.]{0,14}$").unwrap();
    fname_patt.is_match(&s.to_uppercase())
}

/// Convert storage type and name to (storage/length nibbles, name bytes).
/// The name must already have passed `is_name_valid`.
pub fn string_to_file_name(stype: StorageType,s: &str) -> (u8,[u8;15]) {
    let upper = s.to_uppercase();
    let nibs = ((stype as u8) << 4) | upper.len() as u8;
    let mut name = [0_u8;15];
    for (i,byte) in upper.bytes().enumerate() {
        if i >= 15 {
            break;
        }
        name[i] = byte;
    }
    (nibs,name)
}

/// Convert nibbles and name bytes to a string, escaping if necessary.
pub fn file_name_to_string(nibs: u8,name: [u8;15]) -> String {
    let len = (nibs & 0x0f) as usize;
    match String::from_utf8(name[0..len].to_vec()) {
        Ok(s) => s,
        Err(_) => {
            warn!("continuing with invalid filename");
            crate::escaped_ascii_from_bytes(&name[0..len],false)
        }
    }
}

/// A 39 byte file entry in block coordinates minus the 4 byte link prefix.
#[derive(Clone,Copy)]
pub struct Entry {
    pub stor_len_nibs: u8,
    pub name: [u8;15],
    pub file_type: u8,
    pub key_ptr: u16,
    pub blocks_used: u16,
    pub eof: [u8;3],
    pub create_time: [u8;4],
    pub vers: u8,
    pub min_vers: u8,
    pub access: u8,
    pub aux_type: u16,
    pub last_mod: [u8;4],
    pub header_ptr: u16
}

impl Entry {
    pub fn new() -> Self {
        Self {
            stor_len_nibs: 0,
            name: [0;15],
            file_type: 0,
            key_ptr: 0,
            blocks_used: 0,
            eof: [0;3],
            create_time: [0;4],
            vers: 0,
            min_vers: 0,
            access: 0,
            aux_type: 0,
            last_mod: [0;4],
            header_ptr: 0
        }
    }
    pub fn from_bytes(dat: &[u8]) -> Self {
        let mut name = [0_u8;15];
        name.copy_from_slice(&dat[1..16]);
        Self {
            stor_len_nibs: dat[0],
            name,
            file_type: dat[0x10],
            key_ptr: u16::from_le_bytes([dat[0x11],dat[0x12]]),
            blocks_used: u16::from_le_bytes([dat[0x13],dat[0x14]]),
            eof: [dat[0x15],dat[0x16],dat[0x17]],
            create_time: [dat[0x18],dat[0x19],dat[0x1a],dat[0x1b]],
            vers: dat[0x1c],
            min_vers: dat[0x1d],
            access: dat[0x1e],
            aux_type: u16::from_le_bytes([dat[0x1f],dat[0x20]]),
            last_mod: [dat[0x21],dat[0x22],dat[0x23],dat[0x24]],
            header_ptr: u16::from_le_bytes([dat[0x25],dat[0x26]])
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = vec![0;ENTRY_SIZE];
        ans[0] = self.stor_len_nibs;
        ans[1..16].copy_from_slice(&self.name);
        ans[0x10] = self.file_type;
        ans[0x11..0x13].copy_from_slice(&u16::to_le_bytes(self.key_ptr));
        ans[0x13..0x15].copy_from_slice(&u16::to_le_bytes(self.blocks_used));
        ans[0x15..0x18].copy_from_slice(&self.eof);
        ans[0x18..0x1c].copy_from_slice(&self.create_time);
        ans[0x1c] = self.vers;
        ans[0x1d] = self.min_vers;
        ans[0x1e] = self.access;
        ans[0x1f..0x21].copy_from_slice(&u16::to_le_bytes(self.aux_type));
        ans[0x21..0x25].copy_from_slice(&self.last_mod);
        ans[0x25..0x27].copy_from_slice(&u16::to_le_bytes(self.header_ptr));
        ans
    }
    pub fn storage_type(&self) -> u8 {
        self.stor_len_nibs >> 4
    }
    /// present means neither never-used nor deleted nor a header
    pub fn is_present(&self) -> bool {
        self.storage_type() > 0 && self.storage_type() <= StorageType::SubDir as u8
    }
    pub fn name_string(&self) -> String {
        file_name_to_string(self.stor_len_nibs,self.name)
    }
    pub fn eof(&self) -> usize {
        u32::from_le_bytes([self.eof[0],self.eof[1],self.eof[2],0]) as usize
    }
    pub fn set_eof(&mut self,bytes: usize) {
        let le = u32::to_le_bytes(bytes as u32);
        self.eof = [le[0],le[1],le[2]];
    }
    /// locked means the write bit is clear
    pub fn is_locked(&self) -> bool {
        self.access & Access::Write as u8 == 0
    }
}

/// The header entry of a volume directory key block.
/// Offsets are entry-relative (block offset minus 4).
pub struct VolDirHeader {
    pub stor_len_nibs: u8,
    pub name: [u8;15],
    pub create_time: [u8;4],
    pub vers: u8,
    pub min_vers: u8,
    pub access: u8,
    pub entry_len: u8,
    pub entries_per_block: u8,
    pub file_count: u16,
    pub bitmap_ptr: u16,
    pub total_blocks: u16
}

impl VolDirHeader {
    pub fn format(vol_name: &str,bitmap_ptr: u16,total_blocks: u16,create_time: Option<chrono::NaiveDateTime>) -> Self {
        let (nibs,name) = string_to_file_name(StorageType::VolDirHeader,vol_name);
        Self {
            stor_len_nibs: nibs,
            name,
            create_time: pack_time(create_time),
            vers: 0,
            min_vers: 0,
            access: STD_ACCESS,
            entry_len: ENTRY_SIZE as u8,
            entries_per_block: ENTRIES_PER_BLOCK as u8,
            file_count: 0,
            bitmap_ptr,
            total_blocks
        }
    }
    pub fn from_bytes(dat: &[u8]) -> Self {
        let mut name = [0_u8;15];
        name.copy_from_slice(&dat[1..16]);
        Self {
            stor_len_nibs: dat[0],
            name,
            create_time: [dat[0x18],dat[0x19],dat[0x1a],dat[0x1b]],
            vers: dat[0x1c],
            min_vers: dat[0x1d],
            access: dat[0x1e],
            entry_len: dat[0x1f],
            entries_per_block: dat[0x20],
            file_count: u16::from_le_bytes([dat[0x21],dat[0x22]]),
            bitmap_ptr: u16::from_le_bytes([dat[0x23],dat[0x24]]),
            total_blocks: u16::from_le_bytes([dat[0x25],dat[0x26]])
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = vec![0;ENTRY_SIZE];
        ans[0] = self.stor_len_nibs;
        ans[1..16].copy_from_slice(&self.name);
        ans[0x18..0x1c].copy_from_slice(&self.create_time);
        ans[0x1c] = self.vers;
        ans[0x1d] = self.min_vers;
        ans[0x1e] = self.access;
        ans[0x1f] = self.entry_len;
        ans[0x20] = self.entries_per_block;
        ans[0x21..0x23].copy_from_slice(&u16::to_le_bytes(self.file_count));
        ans[0x23..0x25].copy_from_slice(&u16::to_le_bytes(self.bitmap_ptr));
        ans[0x25..0x27].copy_from_slice(&u16::to_le_bytes(self.total_blocks));
        ans
    }
}

/// The header entry of a subdirectory key block.
pub struct SubDirHeader {
    pub stor_len_nibs: u8,
    pub name: [u8;15],
    pub create_time: [u8;4],
    pub vers: u8,
    pub min_vers: u8,
    pub access: u8,
    pub entry_len: u8,
    pub entries_per_block: u8,
    pub file_count: u16,
    pub parent_ptr: u16,
    pub parent_entry_num: u8,
    pub parent_entry_len: u8
}

impl SubDirHeader {
    pub fn create(name: &str,parent_ptr: u16,parent_entry_num: u8,create_time: Option<chrono::NaiveDateTime>) -> Self {
        let (nibs,fname) = string_to_file_name(StorageType::SubDir,name);
        Self {
            stor_len_nibs: nibs,
            name: fname,
            create_time: pack_time(create_time),
            vers: 0,
            min_vers: 0,
            access: STD_ACCESS,
            entry_len: ENTRY_SIZE as u8,
            entries_per_block: ENTRIES_PER_BLOCK as u8,
            file_count: 0,
            parent_ptr,
            parent_entry_num,
            parent_entry_len: ENTRY_SIZE as u8
        }
    }
    pub fn from_bytes(dat: &[u8]) -> Self {
        let mut name = [0_u8;15];
        name.copy_from_slice(&dat[1..16]);
        Self {
            stor_len_nibs: dat[0],
            name,
            create_time: [dat[0x18],dat[0x19],dat[0x1a],dat[0x1b]],
            vers: dat[0x1c],
            min_vers: dat[0x1d],
            access: dat[0x1e],
            entry_len: dat[0x1f],
            entries_per_block: dat[0x20],
            file_count: u16::from_le_bytes([dat[0x21],dat[0x22]]),
            parent_ptr: u16::from_le_bytes([dat[0x23],dat[0x24]]),
            parent_entry_num: dat[0x25],
            parent_entry_len: dat[0x26]
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = vec![0;ENTRY_SIZE];
        ans[0] = self.stor_len_nibs;
        ans[1..16].copy_from_slice(&self.name);
        ans[0x18..0x1c].copy_from_slice(&self.create_time);
        ans[0x1c] = self.vers;
        ans[0x1d] = self.min_vers;
        ans[0x1e] = self.access;
        ans[0x1f] = self.entry_len;
        ans[0x20] = self.entries_per_block;
        ans[0x21..0x23].copy_from_slice(&u16::to_le_bytes(self.file_count));
        ans[0x23..0x25].copy_from_slice(&u16::to_le_bytes(self.parent_ptr));
        ans[0x25] = self.parent_entry_num;
        ans[0x26] = self.parent_entry_len;
        ans
    }
}

/// put a u16 into an index block in the prescribed fashion
pub fn pack_index_ptr(buf: &mut [u8],ptr: u16,idx: usize) {
    let bytes = u16::to_le_bytes(ptr);
    buf[idx] = bytes[0];
    buf[idx+256] = bytes[1];
}

/// get a u16 out of an index block
pub fn unpack_index_ptr(buf: &[u8],idx: usize) -> u16 {
    u16::from_le_bytes([buf[idx],buf[idx+256]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_round_trip() {
        for (y,m,d,hh,mm) in [(1978,6,10,23,59),(1999,12,31,0,0),(2000,1,1,12,30),(2026,8,1,7,45),(2077,2,28,1,1)] {
            let t = chrono::NaiveDate::from_ymd_opt(y,m,d).unwrap().and_hms_opt(hh,mm,0).unwrap();
            assert_eq!(unpack_time(pack_time(Some(t))),Some(t));
        }
    }

    #[test]
    fn name_validity() {
        assert!(is_name_valid("readme"));
        assert!(is_name_valid("A1.B2.C3"));
        assert!(!is_name_valid("9LIVES"));
        assert!(!is_name_valid("TOO.LONG.FOR.PRODOS"));
        assert!(!is_name_valid("BAD NAME"));
        assert!(!is_name_valid(""));
    }

    #[test]
    fn entry_round_trip() {
        let mut entry = Entry::new();
        let (nibs,name) = string_to_file_name(StorageType::Seedling,"readme");
        entry.stor_len_nibs = nibs;
        entry.name = name;
        entry.file_type = FileType::Text as u8;
        entry.key_ptr = 0x1234;
        entry.blocks_used = 1;
        entry.set_eof(3);
        entry.access = STD_ACCESS;
        entry.aux_type = 0xbeef;
        let copy = Entry::from_bytes(&entry.to_bytes());
        assert_eq!(copy.name_string(),"README");
        assert_eq!(copy.key_ptr,0x1234);
        assert_eq!(copy.eof(),3);
        assert_eq!(copy.aux_type,0xbeef);
        assert!(!copy.is_locked());
    }
}
