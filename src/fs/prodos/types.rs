//! ### ProDOS types and constants

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::str::FromStr;
use super::super::Error;

pub const BLOCK_SIZE: usize = 512;
pub const VOL_KEY_BLOCK: u16 = 2;
pub const ENTRY_SIZE: usize = 39;
pub const ENTRIES_PER_BLOCK: usize = 13;
/// safety cap on directory chain traversal
pub const MAX_DIRECTORY_REPS: usize = 100;
/// destroy | rename | backup | write | read
pub const STD_ACCESS: u8 = 0xc3;
/// largest file a seedling can hold
pub const SEEDLING_MAX: usize = 512;
/// largest file a sapling can hold
pub const SAPLING_MAX: usize = 256*512;

#[derive(Clone,Copy,FromPrimitive,PartialEq)]
pub enum StorageType {
    Inactive = 0x00,
    Seedling = 0x01,
    Sapling = 0x02,
    Tree = 0x03,
    Pascal = 0x04,
    SubDir = 0x0d,
    SubDirHeader = 0x0e,
    VolDirHeader = 0x0f
}

#[derive(Clone,Copy,FromPrimitive)]
pub enum Access {
    Read = 0x01,
    Write = 0x02,
    Backup = 0x20,
    Rename = 0x40,
    Destroy = 0x80
}

/// Enumerates a subset of ProDOS file types, available conversions are:
/// * FileType to u8: `as u8`
/// * u8 to FileType: `FileType::from_u8` (use FromPrimitive trait)
/// * &str to FileType: `FileType::from_str`, str can be a number or mnemonic
#[derive(FromPrimitive)]
pub enum FileType {
    None = 0x00,
    Text = 0x04,
    Binary = 0x06,
    Directory = 0x0f,
    IntegerCode = 0xfa,
    IntegerVars = 0xfb,
    ApplesoftCode = 0xfc,
    ApplesoftVars = 0xfd,
    RelocatableCode = 0xfe,
    System = 0xff
}

impl FromStr for FileType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        // string can be the number itself
        if let Ok(num) = u8::from_str(s) {
            return match FileType::from_u8(num) {
                Some(typ) => Ok(typ),
                _ => Err(Error::FileTypeMismatch)
            };
        }
        // or a mnemonic
        match s {
            "txt" => Ok(Self::Text),
            "bin" => Ok(Self::Binary),
            "dir" => Ok(Self::Directory),
            "itok" => Ok(Self::IntegerCode),
            "ivar" => Ok(Self::IntegerVars),
            "atok" => Ok(Self::ApplesoftCode),
            "avar" => Ok(Self::ApplesoftVars),
            "rel" => Ok(Self::RelocatableCode),
            "sys" => Ok(Self::System),
            _ => Err(Error::FileTypeMismatch)
        }
    }
}

/// Map file type codes to strings for display
const TYPE_MAP_DISP: [(u8,&str);15] = [
    (0x00, "UNK"),
    (0x01, "BAD"),
    (0x04, "TXT"),
    (0x06, "BIN"),
    (0x0f, "DIR"),
    (0x19, "ADB"), // AppleWorks Data Base
    (0x1a, "AWP"), // AppleWorks Word Processor
    (0x1b, "ASP"), // AppleWorks Spreadsheet
    (0xef, "PAS"), // Pascal area
    (0xf0, "CMD"),
    (0xfc, "BAS"),
    (0xfd, "VAR"),
    (0xfe, "REL"),
    (0xff, "SYS"),
    (0xfa, "INT")
];

pub fn type_string(file_type: u8) -> &'static str {
    for (code,name) in TYPE_MAP_DISP {
        if code == file_type {
            return name;
        }
    }
    "???"
}
