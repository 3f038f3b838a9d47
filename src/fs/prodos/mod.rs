//! # ProDOS engine
//!
//! This services file operations on images containing one ProDOS volume.
//! Blocks are the unit of allocation; the volume bitmap, the directory
//! chains, and the seedling/sapling/tree storage types all live here.
//!
//! Paths take the form `/VOLUME/DIR/FILE` or `DIR/FILE`; matching is case
//! insensitive and names are stored uppercased.

pub mod types;
pub mod directory;

use log::{debug,error};
use num_traits::FromPrimitive;
use types::*;
use directory::*;
use super::{Disk,Error,FileInfo};
use crate::{STDRESULT,DYNERR};

/// Heuristic test for a volume directory key block, used by detection.
pub(crate) fn is_volume_key_block(block: &[u8]) -> bool {
    if block.len() < BLOCK_SIZE {
        return false;
    }
    let prev = u16::from_le_bytes([block[0],block[1]]);
    let next = u16::from_le_bytes([block[2],block[3]]);
    if prev != 0 || next < 3 || next > 5 {
        return false;
    }
    if block[4] >> 4 != StorageType::VolDirHeader as u8 {
        return false;
    }
    let name_len = (block[4] & 0x0f) as usize;
    if name_len < 1 || name_len > 15 {
        return false;
    }
    for i in 0..name_len {
        let c = block[5+i];
        if !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'.') {
            return false;
        }
    }
    block[0x23] == ENTRY_SIZE as u8 && block[0x24] == ENTRIES_PER_BLOCK as u8
}

/// split a path on slashes, dropping empty components
fn split_path(path: &str) -> Vec<String> {
    path.split('/').filter(|s| s.len() > 0).map(|s| s.to_string()).collect()
}

impl Disk {
    /// Create a blank ProDOS volume.  Boot blocks 0-1, volume directory
    /// blocks 2-5, and the bitmap from block 6 are laid out as ProDOS
    /// FORMAT would; bits beyond `blocks` are held allocated.
    pub fn create_prodos(vol_name: &str,blocks: u16) -> Result<Self,DYNERR> {
        if !is_name_valid(vol_name) || blocks < 16 {
            return Err(Box::new(Error::InvalidArgument));
        }
        let bitmap_ptr: u16 = 6;
        let bitmap_bytes = (blocks as usize + 7) / 8;
        let bitmap_blocks = (bitmap_bytes + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let mut data = vec![0;blocks as usize * BLOCK_SIZE];
        // volume directory key block
        let header = VolDirHeader::format(vol_name,bitmap_ptr,blocks,None);
        data[2*BLOCK_SIZE+2] = 3;
        data[2*BLOCK_SIZE+4..2*BLOCK_SIZE+4+ENTRY_SIZE].copy_from_slice(&header.to_bytes());
        // remaining directory blocks form a chain
        for b in 3..6_usize {
            let offset = b*BLOCK_SIZE;
            data[offset..offset+2].copy_from_slice(&u16::to_le_bytes(b as u16 - 1));
            if b < 5 {
                data[offset+2..offset+4].copy_from_slice(&u16::to_le_bytes(b as u16 + 1));
            }
        }
        // bitmap: everything free, then reserve the system blocks
        let bm = bitmap_ptr as usize * BLOCK_SIZE;
        for i in 0..bitmap_blocks*BLOCK_SIZE {
            data[bm+i] = 0xff;
        }
        let mut reserve = |block: usize| {
            data[bm + block/8] &= (0x80 >> (block % 8)) ^ u8::MAX;
        };
        for b in 0..6 {
            reserve(b);
        }
        for b in 0..bitmap_blocks {
            reserve(bitmap_ptr as usize + b);
        }
        for b in blocks as usize..bitmap_blocks*BLOCK_SIZE*8 {
            reserve(b);
        }
        let mut disk = Disk::blank(
            data,
            super::FileSystemType::ProDos,
            crate::bios::skew::SectorOrder::ProDos,
            (blocks as usize + 7) / 8,
            16);
        disk.volume = vol_name.to_uppercase();
        disk.total_blocks = blocks;
        disk.bitmap_block = bitmap_ptr;
        let key = disk.read_block(VOL_KEY_BLOCK)?;
        disk.volume_digest = hex::encode_upper(&key[4..43]);
        Ok(disk)
    }

    // block bitmap

    fn bitmap_pos(&self,block: u16) -> (u16,usize,u8) {
        let bitmap_block = self.bitmap_block + block/4096;
        let byte = (block as usize % 4096) / 8;
        let bit = 7 - (block % 8) as u8;
        (bitmap_block,byte,bit)
    }
    fn is_block_free(&self,block: u16) -> Result<bool,DYNERR> {
        if block >= self.total_blocks {
            return Ok(false);
        }
        let (bblock,byte,bit) = self.bitmap_pos(block);
        let buf = self.read_block(bblock)?;
        Ok((buf[byte] >> bit) & 1 > 0)
    }
    fn set_block_status(&mut self,block: u16,free: bool) -> STDRESULT {
        let (bblock,byte,bit) = self.bitmap_pos(block);
        let mut buf = self.read_block(bblock)?;
        if free {
            buf[byte] |= 1 << bit;
        } else {
            buf[byte] &= (1 << bit) ^ u8::MAX;
        }
        self.write_block(bblock,&buf)
    }
    /// Allocate one block by linear scan from the first free block.
    pub(crate) fn alloc_block(&mut self) -> Result<u16,DYNERR> {
        for block in 0..self.total_blocks {
            if self.is_block_free(block)? {
                self.set_block_status(block,false)?;
                return Ok(block);
            }
        }
        Err(Box::new(Error::DiskFull))
    }
    pub(crate) fn free_block(&mut self,block: u16) -> STDRESULT {
        if block >= self.total_blocks {
            return Err(Box::new(Error::Range));
        }
        self.set_block_status(block,true)
    }
    fn release_blocks(&mut self,list: &[u16]) {
        for block in list {
            let _ = self.free_block(*block);
        }
    }
    pub(crate) fn prodos_num_free(&self) -> Result<u16,DYNERR> {
        let mut ans: u16 = 0;
        for block in 0..self.total_blocks {
            if self.is_block_free(block)? {
                ans += 1;
            }
        }
        Ok(ans)
    }

    // directory walking and path resolution

    fn check_block(&self,block: u16) -> STDRESULT {
        if block as usize * BLOCK_SIZE + BLOCK_SIZE > self.data.len() {
            error!("block pointer {} is out of bounds",block);
            return Err(Box::new(Error::BadChain));
        }
        Ok(())
    }
    /// Gather every entry slot in a directory chain, header excluded,
    /// empty slots included.  The chain is capped at 100 blocks.
    fn walk_dir(&self,key_block: u16) -> Result<Vec<(u16,usize,Entry)>,DYNERR> {
        let mut ans = Vec::new();
        let mut block = key_block;
        let mut first = true;
        for _try in 0..MAX_DIRECTORY_REPS {
            self.check_block(block)?;
            let buf = self.read_block(block)?;
            let next = u16::from_le_bytes([buf[2],buf[3]]);
            let start = match first {
                true => 1,
                false => 0
            };
            first = false;
            for e in start..ENTRIES_PER_BLOCK {
                let offset = 4 + e*ENTRY_SIZE;
                ans.push((block,e,Entry::from_bytes(&buf[offset..offset+ENTRY_SIZE])));
            }
            if next == 0 {
                return Ok(ans);
            }
            block = next;
        }
        error!("directory chain exceeded {} blocks",MAX_DIRECTORY_REPS);
        Err(Box::new(Error::BadChain))
    }
    fn find_entry_in(&self,dir_block: u16,name: &str) -> Result<(u16,usize,Entry),DYNERR> {
        let upper = name.to_uppercase();
        for (block,idx,entry) in self.walk_dir(dir_block)? {
            if entry.is_present() && entry.name_string() == upper {
                return Ok((block,idx,entry));
            }
        }
        Err(Box::new(Error::FileNotFound))
    }
    /// Resolve a path to the enclosing directory's key block and the bare
    /// final component.  The final component may be empty (the path named
    /// the volume or root).
    fn resolve_path(&self,path: &str) -> Result<(u16,String),DYNERR> {
        let mut components = split_path(path);
        if components.len() > 0 && components[0].to_uppercase() == self.volume.to_uppercase() {
            components.remove(0);
        }
        let mut dir_block = VOL_KEY_BLOCK;
        if components.len() == 0 {
            return Ok((dir_block,String::new()));
        }
        let filename = components.pop().unwrap();
        for dirname in components {
            let (_b,_i,entry) = self.find_entry_in(dir_block,&dirname)?;
            if entry.storage_type() != StorageType::SubDir as u8 {
                debug!("{} is not a directory",dirname);
                return Err(Box::new(Error::FileNotFound));
            }
            dir_block = entry.key_ptr;
        }
        Ok((dir_block,filename))
    }
    fn info_from_entry(&self,entry: &Entry) -> FileInfo {
        let mut info = FileInfo::new();
        info.name = entry.name_string();
        info.file_type = entry.file_type;
        info.type_char = match entry.file_type {
            0x04 => 'T',
            0x06 => 'B',
            0x0f => 'D',
            0xfa => 'I',
            0xfc => 'A',
            _ => '?'
        };
        info.size = entry.eof();
        info.aux_type = entry.aux_type;
        info.blocks = entry.blocks_used;
        info.created = unpack_time(entry.create_time);
        info.modified = unpack_time(entry.last_mod);
        info.locked = entry.is_locked();
        info.is_directory = entry.storage_type() == StorageType::SubDir as u8;
        info.storage_type = entry.storage_type();
        info.key_block = entry.key_ptr;
        info
    }
    pub(crate) fn prodos_read_dir(&self,path: &str) -> Result<Vec<FileInfo>,DYNERR> {
        let (dir_block,filename) = self.resolve_path(path)?;
        let key = match filename.len() {
            0 => dir_block,
            _ => {
                let (_b,_i,entry) = self.find_entry_in(dir_block,&filename)?;
                if entry.storage_type() != StorageType::SubDir as u8 {
                    return Err(Box::new(Error::FileTypeMismatch));
                }
                entry.key_ptr
            }
        };
        let mut ans = Vec::new();
        for (_b,_i,entry) in self.walk_dir(key)? {
            if entry.is_present() {
                ans.push(self.info_from_entry(&entry));
            }
        }
        Ok(ans)
    }
    pub(crate) fn prodos_find(&self,path: &str) -> Result<FileInfo,DYNERR> {
        let (dir_block,filename) = self.resolve_path(path)?;
        if filename.len() == 0 {
            return Err(Box::new(Error::FileNotFound));
        }
        let (_b,_i,entry) = self.find_entry_in(dir_block,&filename)?;
        Ok(self.info_from_entry(&entry))
    }

    // reading by storage type

    fn read_seedling(&self,key: u16,eof: usize) -> Result<Vec<u8>,DYNERR> {
        self.check_block(key)?;
        let mut dat = self.read_block(key)?;
        dat.truncate(eof);
        Ok(dat)
    }
    fn read_sapling(&self,key: u16,eof: usize) -> Result<Vec<u8>,DYNERR> {
        self.check_block(key)?;
        let index = self.read_block(key)?;
        let mut ans = Vec::new();
        let count = (eof + BLOCK_SIZE - 1) / BLOCK_SIZE;
        for slot in 0..count {
            let ptr = unpack_index_ptr(&index,slot);
            if ptr == 0 {
                // sparse hole
                ans.resize(ans.len() + BLOCK_SIZE,0);
            } else {
                self.check_block(ptr)?;
                ans.append(&mut self.read_block(ptr)?);
            }
        }
        ans.truncate(eof);
        Ok(ans)
    }
    fn read_tree(&self,key: u16,eof: usize) -> Result<Vec<u8>,DYNERR> {
        self.check_block(key)?;
        let master = self.read_block(key)?;
        let mut ans = Vec::new();
        let count = (eof + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let mut emitted = 0;
        for mslot in 0..256 {
            if emitted >= count {
                break;
            }
            let iptr = unpack_index_ptr(&master,mslot);
            if iptr == 0 {
                // a missing index block spans 128K of holes
                let span = usize::min(256,count-emitted);
                ans.resize(ans.len() + span*BLOCK_SIZE,0);
                emitted += span;
                continue;
            }
            self.check_block(iptr)?;
            let index = self.read_block(iptr)?;
            for slot in 0..256 {
                if emitted >= count {
                    break;
                }
                let ptr = unpack_index_ptr(&index,slot);
                if ptr == 0 {
                    ans.resize(ans.len() + BLOCK_SIZE,0);
                } else {
                    self.check_block(ptr)?;
                    ans.append(&mut self.read_block(ptr)?);
                }
                emitted += 1;
            }
        }
        ans.truncate(eof);
        Ok(ans)
    }
    pub(crate) fn prodos_extract(&self,path: &str) -> Result<Vec<u8>,DYNERR> {
        let (dir_block,filename) = self.resolve_path(path)?;
        if filename.len() == 0 {
            return Err(Box::new(Error::FileNotFound));
        }
        let (_b,_i,entry) = self.find_entry_in(dir_block,&filename)?;
        let eof = entry.eof();
        match StorageType::from_u8(entry.storage_type()) {
            Some(StorageType::Seedling) => self.read_seedling(entry.key_ptr,eof),
            Some(StorageType::Sapling) => self.read_sapling(entry.key_ptr,eof),
            Some(StorageType::Tree) => self.read_tree(entry.key_ptr,eof),
            _ => Err(Box::new(Error::FileTypeMismatch))
        }
    }

    // writing by storage type

    /// Write the payload choosing the smallest sufficient storage type.
    /// On failure every block already taken is freed before returning.
    fn write_file_blocks(&mut self,dat: &[u8]) -> Result<(u16,StorageType,u16),DYNERR> {
        let mut allocated: Vec<u16> = Vec::new();
        match self.write_file_blocks_inner(dat,&mut allocated) {
            Ok(ans) => Ok(ans),
            Err(e) => {
                self.release_blocks(&allocated);
                Err(e)
            }
        }
    }
    fn alloc_push(&mut self,list: &mut Vec<u16>) -> Result<u16,DYNERR> {
        let block = self.alloc_block()?;
        list.push(block);
        Ok(block)
    }
    fn write_file_blocks_inner(&mut self,dat: &[u8],allocated: &mut Vec<u16>) -> Result<(u16,StorageType,u16),DYNERR> {
        if dat.len() <= SEEDLING_MAX {
            let key = self.alloc_push(allocated)?;
            let mut buf = vec![0;BLOCK_SIZE];
            buf[0..dat.len()].copy_from_slice(dat);
            self.write_block(key,&buf)?;
            return Ok((key,StorageType::Seedling,1));
        }
        if dat.len() <= SAPLING_MAX {
            let key = self.alloc_push(allocated)?;
            let mut index = vec![0;BLOCK_SIZE];
            let mut blocks_used: u16 = 1;
            for (slot,chunk) in dat.chunks(BLOCK_SIZE).enumerate() {
                let data_block = self.alloc_push(allocated)?;
                let mut buf = vec![0;BLOCK_SIZE];
                buf[0..chunk.len()].copy_from_slice(chunk);
                self.write_block(data_block,&buf)?;
                pack_index_ptr(&mut index,data_block,slot);
                blocks_used += 1;
            }
            self.write_block(key,&index)?;
            return Ok((key,StorageType::Sapling,blocks_used));
        }
        if dat.len() > 256*SAPLING_MAX {
            return Err(Box::new(Error::Range));
        }
        let key = self.alloc_push(allocated)?;
        let mut master = vec![0;BLOCK_SIZE];
        let mut blocks_used: u16 = 1;
        for (mslot,group) in dat.chunks(SAPLING_MAX).enumerate() {
            let index_block = self.alloc_push(allocated)?;
            let mut index = vec![0;BLOCK_SIZE];
            blocks_used += 1;
            for (slot,chunk) in group.chunks(BLOCK_SIZE).enumerate() {
                let data_block = self.alloc_push(allocated)?;
                let mut buf = vec![0;BLOCK_SIZE];
                buf[0..chunk.len()].copy_from_slice(chunk);
                self.write_block(data_block,&buf)?;
                pack_index_ptr(&mut index,data_block,slot);
                blocks_used += 1;
            }
            self.write_block(index_block,&index)?;
            pack_index_ptr(&mut master,index_block,mslot);
        }
        self.write_block(key,&master)?;
        Ok((key,StorageType::Tree,blocks_used))
    }
    /// Free the blocks behind a file entry, index blocks included.
    fn free_file_blocks(&mut self,key: u16,storage: u8) -> STDRESULT {
        match StorageType::from_u8(storage) {
            Some(StorageType::Seedling) => self.free_block(key),
            Some(StorageType::Sapling) => {
                self.check_block(key)?;
                let index = self.read_block(key)?;
                for slot in 0..256 {
                    let ptr = unpack_index_ptr(&index,slot);
                    if ptr != 0 && ptr < self.total_blocks {
                        self.free_block(ptr)?;
                    }
                }
                self.free_block(key)
            },
            Some(StorageType::Tree) => {
                self.check_block(key)?;
                let master = self.read_block(key)?;
                for mslot in 0..256 {
                    let iptr = unpack_index_ptr(&master,mslot);
                    if iptr == 0 || iptr >= self.total_blocks {
                        continue;
                    }
                    let index = self.read_block(iptr)?;
                    for slot in 0..256 {
                        let ptr = unpack_index_ptr(&index,slot);
                        if ptr != 0 && ptr < self.total_blocks {
                            self.free_block(ptr)?;
                        }
                    }
                    self.free_block(iptr)?;
                }
                self.free_block(key)
            },
            _ => Err(Box::new(Error::FileTypeMismatch))
        }
    }

    // mutating operations

    pub(crate) fn prodos_inject(&mut self,path: &str,file_type: u8,aux: u16,dat: &[u8]) -> STDRESULT {
        let (dir_block,filename) = self.resolve_path(path)?;
        if !is_name_valid(&filename) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if self.find_entry_in(dir_block,&filename).is_ok() {
            return Err(Box::new(Error::DuplicateFilename));
        }
        let (key,storage,blocks_used) = self.write_file_blocks(dat)?;
        match self.create_file_entry(dir_block,&filename,file_type,aux,key,storage,blocks_used,dat.len()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.free_file_blocks(key,storage as u8)?;
                Err(e)
            }
        }
    }
    fn create_file_entry(&mut self,dir_block: u16,name: &str,file_type: u8,aux: u16,
                         key: u16,storage: StorageType,blocks_used: u16,eof: usize) -> STDRESULT {
        let slot = self.walk_dir(dir_block)?.into_iter().find(|(_b,_i,entry)| entry.storage_type() == 0);
        let (block,idx,_) = match slot {
            Some(found) => found,
            None => {
                debug!("directory at block {} is full",dir_block);
                return Err(Box::new(Error::DiskFull));
            }
        };
        let (nibs,fname) = string_to_file_name(storage,name);
        let stamp = pack_time(None);
        let mut entry = Entry::new();
        entry.stor_len_nibs = nibs;
        entry.name = fname;
        entry.file_type = file_type;
        entry.key_ptr = key;
        entry.blocks_used = blocks_used;
        entry.set_eof(eof);
        entry.create_time = stamp;
        entry.access = STD_ACCESS;
        entry.aux_type = aux;
        entry.last_mod = stamp;
        entry.header_ptr = dir_block;
        let mut buf = self.read_block(block)?;
        let offset = 4 + idx*ENTRY_SIZE;
        buf[offset..offset+ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        self.write_block(block,&buf)?;
        self.change_file_count(dir_block,1)
    }
    fn change_file_count(&mut self,dir_block: u16,delta: i32) -> STDRESULT {
        let mut buf = self.read_block(dir_block)?;
        let count = u16::from_le_bytes([buf[0x25],buf[0x26]]) as i32;
        let new_count = i32::max(count + delta,0) as u16;
        buf[0x25..0x27].copy_from_slice(&u16::to_le_bytes(new_count));
        self.write_block(dir_block,&buf)
    }
    pub(crate) fn prodos_delete(&mut self,path: &str) -> STDRESULT {
        let (dir_block,filename) = self.resolve_path(path)?;
        if filename.len() == 0 {
            return Err(Box::new(Error::FileNotFound));
        }
        let (block,idx,entry) = self.find_entry_in(dir_block,&filename)?;
        if entry.is_locked() {
            return Err(Box::new(Error::WriteProtected));
        }
        self.free_file_blocks(entry.key_ptr,entry.storage_type())?;
        let mut buf = self.read_block(block)?;
        let offset = 4 + idx*ENTRY_SIZE;
        buf[offset..offset+ENTRY_SIZE].fill(0);
        self.write_block(block,&buf)?;
        self.change_file_count(dir_block,-1)
    }
    pub(crate) fn prodos_rename(&mut self,old_path: &str,new_name: &str) -> STDRESULT {
        let (dir_block,old_filename) = self.resolve_path(old_path)?;
        // renames are confined to the enclosing directory
        let new_filename = match new_name.contains('/') {
            true => {
                let (new_dir,bare) = self.resolve_path(new_name)?;
                if new_dir != dir_block {
                    return Err(Box::new(Error::InvalidArgument));
                }
                bare
            },
            false => new_name.to_string()
        };
        if !is_name_valid(&new_filename) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if self.find_entry_in(dir_block,&new_filename).is_ok() {
            return Err(Box::new(Error::DuplicateFilename));
        }
        let (block,idx,entry) = self.find_entry_in(dir_block,&old_filename)?;
        if entry.is_locked() {
            return Err(Box::new(Error::WriteProtected));
        }
        let storage = StorageType::from_u8(entry.storage_type()).ok_or(Error::FileTypeMismatch)?;
        let (nibs,fname) = string_to_file_name(storage,&new_filename);
        let mut buf = self.read_block(block)?;
        let offset = 4 + idx*ENTRY_SIZE;
        buf[offset] = nibs;
        buf[offset+1..offset+16].copy_from_slice(&fname);
        self.write_block(block,&buf)
    }
    pub(crate) fn prodos_set_locked(&mut self,path: &str,locked: bool) -> STDRESULT {
        let (dir_block,filename) = self.resolve_path(path)?;
        if filename.len() == 0 {
            return Err(Box::new(Error::FileNotFound));
        }
        let (block,idx,_entry) = self.find_entry_in(dir_block,&filename)?;
        let mut buf = self.read_block(block)?;
        let offset = 4 + idx*ENTRY_SIZE;
        if locked {
            buf[offset+0x1e] &= (Access::Write as u8) ^ u8::MAX;
        } else {
            buf[offset+0x1e] |= Access::Write as u8;
        }
        self.write_block(block,&buf)
    }
    pub(crate) fn prodos_mkdir(&mut self,path: &str) -> STDRESULT {
        let (parent_block,dirname) = self.resolve_path(path)?;
        if !is_name_valid(&dirname) {
            return Err(Box::new(Error::InvalidArgument));
        }
        if self.find_entry_in(parent_block,&dirname).is_ok() {
            return Err(Box::new(Error::DuplicateFilename));
        }
        let key = self.alloc_block()?;
        let header = SubDirHeader::create(&dirname,parent_block,0,None);
        let mut buf = vec![0;BLOCK_SIZE];
        buf[4..4+ENTRY_SIZE].copy_from_slice(&header.to_bytes());
        self.write_block(key,&buf)?;
        match self.create_file_entry(parent_block,&dirname,FileType::Directory as u8,0,
                                     key,StorageType::SubDir,1,BLOCK_SIZE) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.free_block(key)?;
                Err(e)
            }
        }
    }
}
