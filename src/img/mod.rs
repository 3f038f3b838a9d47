//! # Disk Image Format Module
//!
//! This identifies the container format of a disk image byte stream.
//! Twenty-six formats are registered; each one lives in a submodule of
//! `profiles` and implements the `FormatProfile` trait.
//!
//! A probe is a stateless classifier returning a 0-100 score for "is this
//! buffer an instance of this format?"  The registry runs every probe,
//! discards scores under `MIN_SCORE`, and returns up to `MAX_MATCHES`
//! candidates ranked by descending score.  Scores at or above
//! `HIGH_CONFIDENCE` can be taken at face value; anything lower deserves a
//! look at the runners-up.
//!
//! Parsing never modifies the input, and no profile keeps state between
//! calls.

pub mod profiles;

use std::fmt;
use std::str::FromStr;
use log::debug;

/// Minimum probe score to consider a match
pub const MIN_SCORE: u8 = 30;
/// Scores at or above this are high confidence
pub const HIGH_CONFIDENCE: u8 = 80;
/// Maximum candidates returned by detection
pub const MAX_MATCHES: usize = 5;

/// Enumerates disk image format errors.  The `Display` trait will print the
/// equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unknown image type")]
    UnknownImageType,
    #[error("header does not match format")]
    HeaderMismatch,
    #[error("image is truncated")]
    TruncatedImage
}

/// Every registered container format plus the failure value.
#[derive(PartialEq,Eq,Clone,Copy,Debug,Hash)]
pub enum FormatType {
    Unknown,
    Hfe,
    Woz,
    Dc42,
    D88,
    D77,
    Imd,
    Td0,
    Scp,
    G64,
    Adf,
    Edsk,
    Stx,
    Ipf,
    A2r,
    Nib,
    Fdi,
    Dim,
    Atr,
    Trd,
    Msx,
    F86,
    Kfx,
    Mfi,
    Dsk,
    St,
    Kc85
}

/// Broad class of data the container stores.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum FormatCategory {
    Sector,
    Flux,
    Bitstream,
    Raw
}

/// Platform or system family a format is associated with.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum Platform {
    Generic,
    Amiga,
    AppleII,
    AppleMac,
    Atari8Bit,
    AtariSt,
    Commodore,
    Cpm,
    IbmPc,
    Msx,
    NecPc98,
    FujitsuFm,
    ZxSpectrum,
    Ddr
}

impl fmt::Display for FormatType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match get_descriptor(*self) {
            Some(desc) => write!(f,"{}",desc.name),
            None => write!(f,"UNKNOWN")
        }
    }
}

impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        for desc in &REGISTRY {
            if desc.name.eq_ignore_ascii_case(s) {
                return Ok(desc.tag);
            }
        }
        Err(Error::UnknownImageType)
    }
}

impl fmt::Display for FormatCategory {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sector => write!(f,"Sector"),
            Self::Flux => write!(f,"Flux"),
            Self::Bitstream => write!(f,"Bitstream"),
            Self::Raw => write!(f,"Raw")
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f,"Generic"),
            Self::Amiga => write!(f,"Amiga"),
            Self::AppleII => write!(f,"Apple II"),
            Self::AppleMac => write!(f,"Macintosh"),
            Self::Atari8Bit => write!(f,"Atari 8-bit"),
            Self::AtariSt => write!(f,"Atari ST"),
            Self::Commodore => write!(f,"Commodore"),
            Self::Cpm => write!(f,"CP/M"),
            Self::IbmPc => write!(f,"IBM PC"),
            Self::Msx => write!(f,"MSX"),
            Self::NecPc98 => write!(f,"NEC PC-98"),
            Self::FujitsuFm => write!(f,"Fujitsu FM"),
            Self::ZxSpectrum => write!(f,"ZX Spectrum"),
            Self::Ddr => write!(f,"DDR (East German)")
        }
    }
}

/// Static metadata describing one registered format.
pub struct FormatDescriptor {
    pub tag: FormatType,
    /// short name, e.g. "ADF"
    pub name: &'static str,
    pub description: &'static str,
    /// file extensions, comma separated
    pub extensions: &'static str,
    pub category: FormatCategory,
    pub platform: Platform,
    pub supports_write: bool,
    pub supports_convert: bool,
    pub min_file_size: u32,
    /// 0 = unlimited
    pub max_file_size: u32
}

pub static REGISTRY: [FormatDescriptor;26] = [
    FormatDescriptor { tag: FormatType::Hfe,  name: "HFE",  description: "HxC Floppy Emulator",      extensions: "hfe",        category: FormatCategory::Bitstream, platform: Platform::Generic,    supports_write: true,  supports_convert: true, min_file_size: 512,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Woz,  name: "WOZ",  description: "Apple II WOZ",             extensions: "woz",        category: FormatCategory::Flux,      platform: Platform::AppleII,    supports_write: true,  supports_convert: true, min_file_size: 256,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Dc42, name: "DC42", description: "Apple DiskCopy 4.2",       extensions: "dc42,image", category: FormatCategory::Sector,    platform: Platform::AppleMac,   supports_write: true,  supports_convert: true, min_file_size: 84,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::D88,  name: "D88",  description: "NEC PC-88/PC-98",          extensions: "d88,d98",    category: FormatCategory::Sector,    platform: Platform::NecPc98,    supports_write: true,  supports_convert: true, min_file_size: 688,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::D77,  name: "D77",  description: "Fujitsu FM-7/FM-77",       extensions: "d77",        category: FormatCategory::Sector,    platform: Platform::FujitsuFm,  supports_write: true,  supports_convert: true, min_file_size: 688,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Imd,  name: "IMD",  description: "ImageDisk",                extensions: "imd",        category: FormatCategory::Sector,    platform: Platform::IbmPc,      supports_write: true,  supports_convert: true, min_file_size: 128,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Td0,  name: "TD0",  description: "Teledisk",                 extensions: "td0",        category: FormatCategory::Sector,    platform: Platform::IbmPc,      supports_write: false, supports_convert: true, min_file_size: 12,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Scp,  name: "SCP",  description: "SuperCard Pro",            extensions: "scp",        category: FormatCategory::Flux,      platform: Platform::Generic,    supports_write: true,  supports_convert: true, min_file_size: 16,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::G64,  name: "G64",  description: "Commodore 64 GCR",         extensions: "g64",        category: FormatCategory::Bitstream, platform: Platform::Commodore,  supports_write: true,  supports_convert: true, min_file_size: 8,      max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Adf,  name: "ADF",  description: "Amiga Disk File",          extensions: "adf",        category: FormatCategory::Sector,    platform: Platform::Amiga,      supports_write: true,  supports_convert: true, min_file_size: 901120, max_file_size: 1802240 },
    FormatDescriptor { tag: FormatType::Edsk, name: "EDSK", description: "Extended DSK (Amstrad)",   extensions: "dsk,edsk",   category: FormatCategory::Sector,    platform: Platform::Cpm,        supports_write: true,  supports_convert: true, min_file_size: 256,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Stx,  name: "STX",  description: "Pasti (Atari ST)",         extensions: "stx",        category: FormatCategory::Flux,      platform: Platform::AtariSt,    supports_write: false, supports_convert: true, min_file_size: 16,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Ipf,  name: "IPF",  description: "SPS/CAPS Interchangeable", extensions: "ipf",        category: FormatCategory::Flux,      platform: Platform::Amiga,      supports_write: false, supports_convert: true, min_file_size: 12,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::A2r,  name: "A2R",  description: "Applesauce (Apple II)",    extensions: "a2r",        category: FormatCategory::Flux,      platform: Platform::AppleII,    supports_write: true,  supports_convert: true, min_file_size: 8,      max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Nib,  name: "NIB",  description: "Apple II Nibble",          extensions: "nib",        category: FormatCategory::Bitstream, platform: Platform::AppleII,    supports_write: true,  supports_convert: true, min_file_size: 232960, max_file_size: 232960 },
    FormatDescriptor { tag: FormatType::Fdi,  name: "FDI",  description: "Formatted Disk Image",     extensions: "fdi",        category: FormatCategory::Sector,    platform: Platform::Generic,    supports_write: true,  supports_convert: true, min_file_size: 14,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Dim,  name: "DIM",  description: "Japanese PC DIM",          extensions: "dim",        category: FormatCategory::Sector,    platform: Platform::NecPc98,    supports_write: true,  supports_convert: true, min_file_size: 256,    max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Atr,  name: "ATR",  description: "Atari 8-bit",              extensions: "atr",        category: FormatCategory::Sector,    platform: Platform::Atari8Bit,  supports_write: true,  supports_convert: true, min_file_size: 16,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Trd,  name: "TRD",  description: "TR-DOS (ZX Spectrum)",     extensions: "trd",        category: FormatCategory::Sector,    platform: Platform::ZxSpectrum, supports_write: true,  supports_convert: true, min_file_size: 163840, max_file_size: 655360 },
    FormatDescriptor { tag: FormatType::Msx,  name: "MSX",  description: "MSX Disk",                 extensions: "dsk",        category: FormatCategory::Raw,       platform: Platform::Msx,        supports_write: true,  supports_convert: true, min_file_size: 368640, max_file_size: 737280 },
    FormatDescriptor { tag: FormatType::F86,  name: "86F",  description: "86Box Floppy",             extensions: "86f",        category: FormatCategory::Flux,      platform: Platform::IbmPc,      supports_write: true,  supports_convert: true, min_file_size: 8,      max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Kfx,  name: "KFX",  description: "KryoFlux RAW",             extensions: "raw",        category: FormatCategory::Flux,      platform: Platform::Generic,    supports_write: false, supports_convert: true, min_file_size: 16,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Mfi,  name: "MFI",  description: "MAME Floppy Image",        extensions: "mfi",        category: FormatCategory::Flux,      platform: Platform::Generic,    supports_write: false, supports_convert: true, min_file_size: 16,     max_file_size: 0 },
    FormatDescriptor { tag: FormatType::Dsk,  name: "DSK",  description: "CP/M / Apple II DSK",      extensions: "dsk,do,po",  category: FormatCategory::Raw,       platform: Platform::Cpm,        supports_write: true,  supports_convert: true, min_file_size: 1024,   max_file_size: 0 },
    FormatDescriptor { tag: FormatType::St,   name: "ST",   description: "Atari ST Raw",             extensions: "st",         category: FormatCategory::Raw,       platform: Platform::AtariSt,    supports_write: true,  supports_convert: true, min_file_size: 368640, max_file_size: 1474560 },
    FormatDescriptor { tag: FormatType::Kc85, name: "KC85", description: "KC85/Z1013 (DDR)",         extensions: "kc,kcd",     category: FormatCategory::Sector,    platform: Platform::Ddr,        supports_write: true,  supports_convert: true, min_file_size: 163840, max_file_size: 1024000 }
];

/// Contract every format profile implements.  Probes are stateless
/// functions of the input byte slice.
pub trait FormatProfile {
    /// the registry tag this profile services
    fn what_am_i(&self) -> FormatType;
    /// cheap header magic test
    fn validate_signature(&self,dat: &[u8]) -> bool;
    /// aggregate confidence combining signature, size and geometry
    /// plausibility, and interior sanity checks
    fn probe(&self,dat: &[u8]) -> u8;
}

/// Get the profile behind a format tag.
pub fn profile(tag: FormatType) -> Option<&'static dyn FormatProfile> {
    match tag {
        FormatType::Unknown => None,
        FormatType::Hfe => Some(&profiles::hfe::Hfe),
        FormatType::Woz => Some(&profiles::woz::Woz),
        FormatType::Dc42 => Some(&profiles::dc42::Dc42),
        FormatType::D88 => Some(&profiles::d88::D88),
        FormatType::D77 => Some(&profiles::d77::D77),
        FormatType::Imd => Some(&profiles::imd::Imd),
        FormatType::Td0 => Some(&profiles::td0::Td0),
        FormatType::Scp => Some(&profiles::scp::Scp),
        FormatType::G64 => Some(&profiles::g64::G64),
        FormatType::Adf => Some(&profiles::adf::Adf),
        FormatType::Edsk => Some(&profiles::edsk::Edsk),
        FormatType::Stx => Some(&profiles::stx::Stx),
        FormatType::Ipf => Some(&profiles::ipf::Ipf),
        FormatType::A2r => Some(&profiles::a2r::A2r),
        FormatType::Nib => Some(&profiles::nib::Nib),
        FormatType::Fdi => Some(&profiles::fdi::Fdi),
        FormatType::Dim => Some(&profiles::dim::Dim),
        FormatType::Atr => Some(&profiles::atr::Atr),
        FormatType::Trd => Some(&profiles::trd::Trd),
        FormatType::Msx => Some(&profiles::msx::Msx),
        FormatType::F86 => Some(&profiles::f86::F86),
        FormatType::Kfx => Some(&profiles::kfx::Kfx),
        FormatType::Mfi => Some(&profiles::mfi::Mfi),
        FormatType::Dsk => Some(&profiles::dsk::Dsk),
        FormatType::St => Some(&profiles::st::St),
        FormatType::Kc85 => Some(&profiles::kc85::Kc85)
    }
}

/// Get the static metadata behind a format tag.
pub fn get_descriptor(tag: FormatType) -> Option<&'static FormatDescriptor> {
    REGISTRY.iter().find(|desc| desc.tag == tag)
}

/// One scored candidate from detection.
pub struct FormatMatch {
    pub tag: FormatType,
    pub score: u8,
    pub descriptor: &'static FormatDescriptor
}

/// Candidates ranked by descending score, best first.
pub struct Detection {
    pub matches: Vec<FormatMatch>,
    pub best: FormatType,
    pub best_score: u8
}

/// Probe one format.
pub fn probe_single(tag: FormatType,dat: &[u8]) -> u8 {
    match profile(tag) {
        Some(p) => p.probe(dat),
        None => 0
    }
}

/// Run every probe and rank the results.  Candidates scoring under
/// `MIN_SCORE` are discarded; at most `MAX_MATCHES` are returned.
pub fn detect(dat: &[u8]) -> Detection {
    let mut scored: Vec<(FormatType,u8)> = Vec::new();
    if dat.len() > 0 {
        for desc in &REGISTRY {
            let score = probe_single(desc.tag,dat);
            if score >= MIN_SCORE {
                debug!("{} scored {}",desc.name,score);
                scored.push((desc.tag,score));
            }
        }
    }
    scored.sort_by(|a,b| b.1.cmp(&a.1));
    scored.truncate(MAX_MATCHES);
    let (best,best_score) = match scored.first() {
        Some((tag,score)) => (*tag,*score),
        None => (FormatType::Unknown,0)
    };
    Detection {
        matches: scored.iter().map(|(tag,score)| FormatMatch {
            tag: *tag,
            score: *score,
            descriptor: get_descriptor(*tag).expect("registry entry missing")
        }).collect(),
        best,
        best_score
    }
}

/// One-shot detection, returns only the winning tag.
pub fn identify(dat: &[u8]) -> FormatType {
    detect(dat).best
}

/// All tags whose descriptor declares the given platform.
pub fn get_by_platform(platform: Platform) -> Vec<FormatType> {
    REGISTRY.iter().filter(|desc| desc.platform == platform).map(|desc| desc.tag).collect()
}

pub fn can_write(tag: FormatType) -> bool {
    match get_descriptor(tag) {
        Some(desc) => desc.supports_write,
        None => false
    }
}

pub fn can_convert(tag: FormatType) -> bool {
    match get_descriptor(tag) {
        Some(desc) => desc.supports_convert,
        None => false
    }
}
