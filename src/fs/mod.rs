//! # File System Module
//!
//! This imposes an Apple file system on a flat sector image.  There is a
//! sub-module for each supported file system (DOS 3.x and ProDOS), both of
//! which operate through the `Disk` facade defined here.
//!
//! The facade owns the image bytes.  When a `Disk` is opened, detection runs
//! once and the result is cached: the file system tag, the sector order, the
//! geometry, and a digest of the volume header.  Every subsequent operation is
//! dispatched to the matching engine.  Nothing is permanent until the buffer
//! is written back out with `save` or retrieved with `to_bytes`.
//!
//! Sector addressing goes through the skew tables in `bios::skew`.  ProDOS
//! blocks address the image sequentially (block number times 512); the
//! interleave tables govern track/sector addressing and order conversion.

pub mod dos33;
pub mod prodos;

use std::fmt;
use log::{debug,info};
use crate::bios::skew::SectorOrder;
use crate::{STDRESULT,DYNERR};

pub const SECTOR_SIZE: usize = 256;
pub const BLOCK_SIZE: usize = 512;

/// Enumerates file system errors.  The `Display` trait will print the
/// equivalent message, DOS-style where DOS has one.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("RANGE ERROR")]
    Range,
    #[error("I/O ERROR")]
    IOError,
    #[error("FILE NOT FOUND")]
    FileNotFound,
    #[error("DUPLICATE FILENAME")]
    DuplicateFilename,
    #[error("DISK FULL")]
    DiskFull,
    #[error("WRITE PROTECTED")]
    WriteProtected,
    #[error("FILE TYPE MISMATCH")]
    FileTypeMismatch,
    #[error("damaged chain in disk structures")]
    BadChain,
    #[error("file system not compatible with request")]
    FileSystemMismatch,
    #[error("could not identify file system")]
    UnsupportedFileSystem
}

/// Enumerates the file systems the facade can mount.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum FileSystemType {
    Dos33,
    Dos32,
    ProDos
}

impl fmt::Display for FileSystemType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dos33 => write!(f,"DOS 3.3"),
            Self::Dos32 => write!(f,"DOS 3.2"),
            Self::ProDos => write!(f,"ProDOS")
        }
    }
}

/// Result of running detection over an image buffer.
#[derive(Clone,Debug)]
pub struct Detection {
    pub fs_type: FileSystemType,
    pub order: SectorOrder,
    pub tracks: usize,
    pub sectors_per_track: usize,
    pub volume_name: String,
    pub confidence: u8
}

/// A parsed directory entry in a form shared by both engines.
/// DOS 3.3 fills the track/sector fields, ProDOS the block fields.
#[derive(Clone,Debug)]
pub struct FileInfo {
    pub name: String,
    pub file_type: u8,
    pub type_char: char,
    pub size: usize,
    pub aux_type: u16,
    /// sectors used (DOS) or blocks used (ProDOS)
    pub blocks: u16,
    pub created: Option<chrono::NaiveDateTime>,
    pub modified: Option<chrono::NaiveDateTime>,
    pub locked: bool,
    pub is_directory: bool,
    /// ProDOS storage type nibble, 0 for DOS files
    pub storage_type: u8,
    /// ProDOS key block (first data block, index, or master index)
    pub key_block: u16,
    /// DOS T/S list pointer
    pub ts_list: [u8;2]
}

impl FileInfo {
    pub(crate) fn new() -> Self {
        Self {
            name: String::new(),
            file_type: 0,
            type_char: '?',
            size: 0,
            aux_type: 0,
            blocks: 0,
            created: None,
            modified: None,
            locked: false,
            is_directory: false,
            storage_type: 0,
            key_block: 0,
            ts_list: [0,0]
        }
    }
}

/// The primary interface for disk operations.  The `Disk` owns the image
/// buffer and caches the detection result at open time.
pub struct Disk {
    pub(crate) data: Vec<u8>,
    pub(crate) modified: bool,
    fs_type: FileSystemType,
    order: SectorOrder,
    pub(crate) tracks: usize,
    pub(crate) secs_per_track: usize,
    /// DOS 3.x only, flushed to its sector by mutating operations
    pub(crate) vtoc: Option<dos33::types::Vtoc>,
    /// ProDOS only
    pub(crate) total_blocks: u16,
    pub(crate) bitmap_block: u16,
    pub(crate) volume: String,
    pub(crate) volume_digest: String
}

/// Geometry guess from the image length alone; these are the only
/// sizes the facade will mount.
fn geometry_from_size(size: usize) -> Option<(usize,usize)> {
    match size {
        116480 => Some((35,13)),
        143360 => Some((35,16)),
        163840 => Some((40,16)),
        819200 => Some((100,32)),
        _ => None
    }
}

impl Disk {
    /// Detect the file system on an image buffer without mounting it.
    /// Detection is tried in priority order: ProDOS volume on block 2,
    /// DOS 3.3 VTOC at track 17 sector 0, DOS 3.2 VTOC (13 sector).
    pub fn detect(data: &[u8]) -> Result<Detection,DYNERR> {
        if data.len() == 0 {
            return Err(Box::new(Error::InvalidArgument));
        }
        let (tracks,secs) = match geometry_from_size(data.len()) {
            Some(geo) => geo,
            None => {
                debug!("image size {} does not match any Apple geometry",data.len());
                return Err(Box::new(Error::InvalidArgument));
            }
        };
        // ProDOS: volume directory key block at block 2
        if data.len() >= 3*BLOCK_SIZE && prodos::is_volume_key_block(&data[2*BLOCK_SIZE..3*BLOCK_SIZE]) {
            let name_len = (data[2*BLOCK_SIZE+4] & 0x0f) as usize;
            let name = String::from_utf8_lossy(&data[2*BLOCK_SIZE+5..2*BLOCK_SIZE+5+name_len]).to_string();
            info!("identified ProDOS volume /{}",name);
            return Ok(Detection {
                fs_type: FileSystemType::ProDos,
                order: SectorOrder::ProDos,
                tracks,
                sectors_per_track: secs,
                volume_name: name,
                confidence: 95
            });
        }
        // DOS 3.x: VTOC at track 17 sector 0 under the DOS order (slot 0)
        let vtoc_offset = 17 * secs * SECTOR_SIZE;
        if vtoc_offset + SECTOR_SIZE <= data.len() {
            let vtoc = dos33::types::Vtoc::from_bytes(&data[vtoc_offset..vtoc_offset+SECTOR_SIZE]);
            if vtoc.plausible() {
                let fs_type = match vtoc.sectors {
                    13 => FileSystemType::Dos32,
                    _ => FileSystemType::Dos33
                };
                info!("identified {} volume {}",fs_type,vtoc.volume);
                return Ok(Detection {
                    fs_type,
                    order: match fs_type { FileSystemType::Dos32 => SectorOrder::Dos32, _ => SectorOrder::Dos },
                    tracks: vtoc.tracks as usize,
                    sectors_per_track: vtoc.sectors as usize,
                    volume_name: format!("DISK VOLUME {:03}",vtoc.volume),
                    confidence: 90
                });
            }
            debug!("no plausible VTOC at track 17");
        }
        Err(Box::new(Error::UnsupportedFileSystem))
    }
    /// Mount an image, copying the caller's bytes.
    pub fn open(data: &[u8]) -> Result<Self,DYNERR> {
        Self::open_owned(data.to_vec())
    }
    /// Mount an image, taking ownership of the buffer without copying.
    pub fn open_owned(data: Vec<u8>) -> Result<Self,DYNERR> {
        let detection = Self::detect(&data)?;
        let mut disk = Self {
            data,
            modified: false,
            fs_type: detection.fs_type,
            order: detection.order,
            tracks: detection.tracks,
            secs_per_track: detection.sectors_per_track,
            vtoc: None,
            total_blocks: 0,
            bitmap_block: 0,
            volume: String::new(),
            volume_digest: String::new()
        };
        match detection.fs_type {
            FileSystemType::Dos33 | FileSystemType::Dos32 => {
                let buf = disk.read_sector(dos33::types::VTOC_TRACK,0)?;
                disk.vtoc = Some(dos33::types::Vtoc::from_bytes(&buf));
                disk.volume_digest = hex::encode_upper(&buf[0..56]);
            },
            FileSystemType::ProDos => {
                let key = disk.read_block(prodos::types::VOL_KEY_BLOCK)?;
                disk.volume = detection.volume_name.clone();
                disk.total_blocks = u16::from_le_bytes([key[0x29],key[0x2a]]);
                disk.bitmap_block = u16::from_le_bytes([key[0x27],key[0x28]]);
                disk.volume_digest = hex::encode_upper(&key[4..43]);
            }
        }
        Ok(disk)
    }
    pub fn fs_type(&self) -> FileSystemType {
        self.fs_type
    }
    pub fn order(&self) -> SectorOrder {
        self.order
    }
    /// `(tracks, sectors per track)`
    pub fn geometry(&self) -> (usize,usize) {
        (self.tracks,self.secs_per_track)
    }
    pub fn is_modified(&self) -> bool {
        self.modified
    }
    /// Hex digest of the volume header bytes captured at open time.
    pub fn volume_digest(&self) -> &str {
        &self.volume_digest
    }
    /// Volume identification in the form the system itself would print,
    /// `DISK VOLUME nnn` for DOS 3.x and `/NAME` for ProDOS.
    pub fn volume_name(&self) -> String {
        match self.fs_type {
            FileSystemType::ProDos => match self.volume.len() {
                0 => "/UNTITLED".to_string(),
                _ => format!("/{}",self.volume)
            },
            _ => match &self.vtoc {
                Some(vtoc) => format!("DISK VOLUME {:03}",vtoc.volume),
                None => "DISK VOLUME ???".to_string()
            }
        }
    }
    /// used by both engines to assemble a fresh disk in a zeroed buffer
    pub(crate) fn blank(data: Vec<u8>,fs_type: FileSystemType,order: SectorOrder,tracks: usize,secs: usize) -> Self {
        Self {
            data,
            modified: true,
            fs_type,
            order,
            tracks,
            secs_per_track: secs,
            vtoc: None,
            total_blocks: 0,
            bitmap_block: 0,
            volume: String::new(),
            volume_digest: String::new()
        }
    }

    // sector and block access

    fn sector_offset(&self,track: u8,sector: u8) -> Result<usize,DYNERR> {
        if track as usize >= self.tracks || sector as usize >= self.secs_per_track {
            return Err(Box::new(Error::Range));
        }
        let slot = self.order.physical_sector(sector as usize,self.secs_per_track);
        let offset = (track as usize * self.secs_per_track + slot) * SECTOR_SIZE;
        match offset + SECTOR_SIZE <= self.data.len() {
            true => Ok(offset),
            false => Err(Box::new(Error::IOError))
        }
    }
    /// Read a 256 byte sector, going through the active order map.
    pub fn read_sector(&self,track: u8,sector: u8) -> Result<Vec<u8>,DYNERR> {
        let offset = self.sector_offset(track,sector)?;
        Ok(self.data[offset..offset+SECTOR_SIZE].to_vec())
    }
    /// Write a 256 byte sector.  If `dat` is shorter than a sector the
    /// trailing bytes are unaffected.  Sets the modified flag.
    pub fn write_sector(&mut self,track: u8,sector: u8,dat: &[u8]) -> STDRESULT {
        let offset = self.sector_offset(track,sector)?;
        let count = usize::min(dat.len(),SECTOR_SIZE);
        self.data[offset..offset+count].copy_from_slice(&dat[0..count]);
        self.modified = true;
        Ok(())
    }
    /// Read a 512 byte ProDOS block.  Blocks are stored sequentially by
    /// block number, i.e. the two halves sit in consecutive physical slots.
    pub fn read_block(&self,block: u16) -> Result<Vec<u8>,DYNERR> {
        let offset = block as usize * BLOCK_SIZE;
        if offset + BLOCK_SIZE > self.data.len() {
            return Err(Box::new(Error::Range));
        }
        Ok(self.data[offset..offset+BLOCK_SIZE].to_vec())
    }
    /// Write a 512 byte ProDOS block; sets the modified flag.
    pub fn write_block(&mut self,block: u16,dat: &[u8]) -> STDRESULT {
        let offset = block as usize * BLOCK_SIZE;
        if offset + BLOCK_SIZE > self.data.len() {
            return Err(Box::new(Error::Range));
        }
        let count = usize::min(dat.len(),BLOCK_SIZE);
        self.data[offset..offset+count].copy_from_slice(&dat[0..count]);
        self.modified = true;
        Ok(())
    }

    // file operations, dispatched by file system tag

    /// List a directory.  DOS 3.x has a flat catalog, so `path` is ignored
    /// there; for ProDOS the path must name a directory.
    pub fn read_dir(&self,path: &str) -> Result<Vec<FileInfo>,DYNERR> {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_read_dir(path),
            _ => self.dos_read_catalog()
        }
    }
    /// Find a file by name (DOS 3.x) or path (ProDOS).
    pub fn find(&self,path: &str) -> Result<FileInfo,DYNERR> {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_find(path),
            _ => self.dos_find(path)
        }
    }
    /// Recover a file's contents.  For DOS binary files the embedded
    /// address/length header is stripped and the embedded length honored.
    pub fn extract(&self,path: &str) -> Result<Vec<u8>,DYNERR> {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_extract(path),
            _ => self.dos_extract(path)
        }
    }
    /// Write a new file.  `aux` is the load address for DOS binary files,
    /// or the ProDOS auxiliary type.  Fails if the name is taken.
    pub fn inject(&mut self,path: &str,file_type: u8,aux: u16,dat: &[u8]) -> STDRESULT {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_inject(path,file_type,aux,dat),
            _ => self.dos_inject(path,file_type,aux,dat)
        }
    }
    /// Delete a file.  Locked files report WRITE PROTECTED.
    pub fn delete(&mut self,path: &str) -> STDRESULT {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_delete(path),
            _ => self.dos_delete(path)
        }
    }
    /// Rename a file.  ProDOS renames are confined to one directory.
    pub fn rename(&mut self,old_path: &str,new_name: &str) -> STDRESULT {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_rename(old_path,new_name),
            _ => self.dos_rename(old_path,new_name)
        }
    }
    /// Lock or unlock a file.
    pub fn set_locked(&mut self,path: &str,locked: bool) -> STDRESULT {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_set_locked(path,locked),
            _ => self.dos_set_locked(path,locked)
        }
    }
    /// Create a subdirectory (ProDOS only).
    pub fn mkdir(&mut self,path: &str) -> STDRESULT {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_mkdir(path),
            _ => Err(Box::new(Error::FileSystemMismatch))
        }
    }
    /// Count free sectors (DOS 3.x) or free blocks (ProDOS).
    pub fn get_free(&self) -> Result<u16,DYNERR> {
        match self.fs_type {
            FileSystemType::ProDos => self.prodos_num_free(),
            _ => self.dos_num_free()
        }
    }

    // persistence

    /// Get the image bytes, flushing the in-memory VTOC first.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        if self.vtoc.is_some() {
            self.flush_vtoc().expect("VTOC sector went out of bounds");
        }
        self.data.clone()
    }
    /// Save the image byte-for-byte, flushing the in-memory VTOC first,
    /// and clear the modified flag.
    pub fn save(&mut self,path: &str) -> STDRESULT {
        let bytes = self.to_bytes();
        std::fs::write(path,&bytes)?;
        self.modified = false;
        Ok(())
    }
    /// Volume report in JSON, if indent=0 use unpretty form.
    pub fn to_json(&self,indent: u16) -> String {
        let mut root = json::JsonValue::new_object();
        root["filesystem"] = json::JsonValue::String(self.fs_type.to_string());
        root["tracks"] = json::JsonValue::Number(self.tracks.into());
        root["sectors_per_track"] = json::JsonValue::Number(self.secs_per_track.into());
        match self.fs_type {
            FileSystemType::ProDos => {
                root["volume_name"] = json::JsonValue::String(self.volume.clone());
                root["total_blocks"] = json::JsonValue::Number(self.total_blocks.into());
                if let Ok(free) = self.get_free() {
                    root["free_blocks"] = json::JsonValue::Number(free.into());
                }
            },
            _ => {
                if let Some(vtoc) = &self.vtoc {
                    root["volume_number"] = json::JsonValue::Number(vtoc.volume.into());
                }
                if let Ok(free) = self.get_free() {
                    root["free_sectors"] = json::JsonValue::Number(free.into());
                }
            }
        }
        let mut files = json::JsonValue::new_array();
        if let Ok(listing) = self.read_dir("") {
            for info in listing {
                let mut obj = json::JsonValue::new_object();
                obj["name"] = json::JsonValue::String(info.name);
                match self.fs_type {
                    FileSystemType::ProDos => {
                        obj["type"] = json::JsonValue::String(prodos::types::type_string(info.file_type).to_string());
                        obj["blocks"] = json::JsonValue::Number(info.blocks.into());
                        obj["size"] = json::JsonValue::Number(info.size.into());
                    },
                    _ => {
                        obj["type"] = json::JsonValue::String(info.type_char.to_string());
                        obj["sectors"] = json::JsonValue::Number(info.blocks.into());
                    }
                }
                obj["locked"] = json::JsonValue::Boolean(info.locked);
                files.push(obj).expect("error while building JSON array");
            }
        }
        root["files"] = files;
        if indent > 0 {
            json::stringify_pretty(root,indent)
        } else {
            json::stringify(root)
        }
    }
}
