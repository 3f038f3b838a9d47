//! # DOS 3.x engine
//!
//! This services file operations on disk images containing one DOS 3.2 or
//! DOS 3.3 volume.  The catalog is flat, so paths are bare filenames.
//!
//! The VTOC is cached on the `Disk` facade and mutated in memory; every
//! mutating operation flushes it back to track 17 sector 0 before returning,
//! and `save`/`to_bytes` flush it again for good measure.

pub mod types;

use log::{debug,error};
use types::*;
use super::{Disk,Error,FileInfo};
use crate::{STDRESULT,DYNERR};

impl Disk {
    /// Create a blank standard DOS 3.3 volume (140K, 35 tracks, 16 sectors).
    /// Track 0 sectors 0-2 and all of track 17 start out reserved.
    pub fn create_dos33(volume: u8) -> Result<Self,DYNERR> {
        let vol = match volume {
            0 | 255 => 254,
            v => v
        };
        let mut disk = Disk::blank(
            vec![0;35*16*256],
            super::FileSystemType::Dos33,
            crate::bios::skew::SectorOrder::Dos,
            35,16);
        let mut vtoc = Vtoc::from_bytes(&vec![0;256]);
        vtoc.catalog_track = VTOC_TRACK;
        vtoc.catalog_sector = 15;
        vtoc.version = 3;
        vtoc.volume = vol;
        vtoc.max_pairs = MAX_PAIRS as u8;
        vtoc.last_track = VTOC_TRACK;
        vtoc.direction = 1;
        vtoc.tracks = 35;
        vtoc.sectors = 16;
        vtoc.bytes = 256;
        for track in 0..35 {
            let group = track*4;
            if track == 0 {
                // sectors 0-2 hold the boot image
                vtoc.bitmap[group] = 0x1f;
                vtoc.bitmap[group+1] = 0xff;
            } else if track == VTOC_TRACK as usize {
                // VTOC and catalog
                vtoc.bitmap[group] = 0x00;
                vtoc.bitmap[group+1] = 0x00;
            } else {
                vtoc.bitmap[group] = 0xff;
                vtoc.bitmap[group+1] = 0xff;
            }
        }
        disk.vtoc = Some(vtoc);
        disk.flush_vtoc()?;
        // catalog chain runs from sector 15 down to sector 1
        for sec in (1_u8..16).rev() {
            let mut cat = CatalogSector::new();
            if sec > 1 {
                cat.next_track = VTOC_TRACK;
                cat.next_sector = sec - 1;
            }
            disk.write_sector(VTOC_TRACK,sec,&cat.to_bytes())?;
        }
        // minimal boot signature
        disk.write_sector(0,0,&vec![0x01])?;
        Ok(disk)
    }
    pub(crate) fn flush_vtoc(&mut self) -> STDRESULT {
        let bytes = match &self.vtoc {
            Some(vtoc) => vtoc.to_bytes(),
            None => return Err(Box::new(Error::FileSystemMismatch))
        };
        self.write_sector(VTOC_TRACK,0,&bytes)
    }

    // VTOC bitmap

    fn is_sector_free(&self,track: u8,sector: u8) -> bool {
        let vtoc = self.vtoc.as_ref().expect("VTOC not loaded");
        let byte = track as usize * 4 + (sector >> 3) as usize;
        let bit = 7 - (sector & 7);
        (vtoc.bitmap[byte] >> bit) & 1 > 0
    }
    fn mark_sector(&mut self,track: u8,sector: u8,free: bool) {
        let vtoc = self.vtoc.as_mut().expect("VTOC not loaded");
        let byte = track as usize * 4 + (sector >> 3) as usize;
        let bit = 7 - (sector & 7);
        if free {
            vtoc.bitmap[byte] |= 1 << bit;
        } else {
            vtoc.bitmap[byte] &= (1 << bit) ^ u8::MAX;
        }
    }
    /// Allocate one sector.  The search starts at the last allocated track
    /// and walks in the current direction, skipping the catalog track,
    /// wrapping at the image ends and reversing.  A full cycle with no free
    /// sector is disk-full.
    pub(crate) fn alloc_sector(&mut self) -> Result<[u8;2],DYNERR> {
        let vtoc = self.vtoc.as_ref().ok_or(Error::FileSystemMismatch)?;
        let tracks = vtoc.tracks;
        let secs = vtoc.sectors;
        let last = match vtoc.last_track < tracks {
            true => vtoc.last_track,
            false => VTOC_TRACK
        };
        let dir: i8 = match vtoc.direction < 0 {
            true => -1,
            false => 1
        };
        let mut search: Vec<(u8,i8)> = Vec::new();
        if dir > 0 {
            for t in last..tracks {
                search.push((t,dir));
            }
            for t in (0..last).rev() {
                search.push((t,-dir));
            }
        } else {
            for t in (0..=last).rev() {
                search.push((t,dir));
            }
            for t in last+1..tracks {
                search.push((t,-dir));
            }
        }
        for (track,leg) in search {
            if track == VTOC_TRACK {
                continue;
            }
            for sector in 0..secs {
                if self.is_sector_free(track,sector) {
                    self.mark_sector(track,sector,false);
                    let vtoc = self.vtoc.as_mut().unwrap();
                    vtoc.last_track = track;
                    vtoc.direction = leg;
                    return Ok([track,sector]);
                }
            }
        }
        Err(Box::new(Error::DiskFull))
    }
    pub(crate) fn free_sector(&mut self,track: u8,sector: u8) {
        self.mark_sector(track,sector,true);
    }
    fn release_sectors(&mut self,list: &[[u8;2]]) {
        for ts in list {
            self.free_sector(ts[0],ts[1]);
        }
    }
    pub(crate) fn dos_num_free(&self) -> Result<u16,DYNERR> {
        let vtoc = self.vtoc.as_ref().ok_or(Error::FileSystemMismatch)?;
        let (tracks,secs) = (vtoc.tracks,vtoc.sectors);
        let mut ans: u16 = 0;
        for track in 0..tracks {
            for sector in 0..secs {
                if self.is_sector_free(track,sector) {
                    ans += 1;
                }
            }
        }
        Ok(ans)
    }

    // catalog

    fn check_ts(&self,ts: [u8;2]) -> STDRESULT {
        if ts[0] as usize >= self.tracks || ts[1] as usize >= self.secs_per_track {
            error!("chain pointer T{} S{} is out of bounds",ts[0],ts[1]);
            return Err(Box::new(Error::BadChain));
        }
        Ok(())
    }
    /// Find a file's catalog entry.  Returns the catalog sector address, the
    /// entry index within it, and the parsed entry.
    fn find_entry(&self,name: &str) -> Result<([u8;2],usize,CatalogEntry),DYNERR> {
        let vtoc = self.vtoc.as_ref().ok_or(Error::FileSystemMismatch)?;
        let fname = string_to_file_name(name);
        let mut ts = [vtoc.catalog_track,vtoc.catalog_sector];
        for _try in 0..MAX_CATALOG_REPS {
            self.check_ts(ts)?;
            let buf = self.read_sector(ts[0],ts[1])?;
            let cat = CatalogSector::from_bytes(&buf);
            for e in 0..ENTRIES_PER_SECTOR {
                if cat.entries[e].is_in_use() && cat.entries[e].name == fname {
                    return Ok((ts,e,cat.entries[e]));
                }
            }
            ts = [cat.next_track,cat.next_sector];
            if ts == [0,0] {
                return Err(Box::new(Error::FileNotFound));
            }
        }
        error!("catalog chain exceeded {} sectors",MAX_CATALOG_REPS);
        Err(Box::new(Error::BadChain))
    }
    pub(crate) fn dos_read_catalog(&self) -> Result<Vec<FileInfo>,DYNERR> {
        let vtoc = self.vtoc.as_ref().ok_or(Error::FileSystemMismatch)?;
        let mut ans = Vec::new();
        let mut ts = [vtoc.catalog_track,vtoc.catalog_sector];
        for _try in 0..MAX_CATALOG_REPS {
            self.check_ts(ts)?;
            let buf = self.read_sector(ts[0],ts[1])?;
            let cat = CatalogSector::from_bytes(&buf);
            for entry in cat.entries {
                if entry.is_in_use() {
                    ans.push(self.dos33_info_from_entry(&entry));
                }
            }
            ts = [cat.next_track,cat.next_sector];
            if ts == [0,0] {
                return Ok(ans);
            }
        }
        error!("catalog chain exceeded {} sectors",MAX_CATALOG_REPS);
        Err(Box::new(Error::BadChain))
    }
    fn dos33_info_from_entry(&self,entry: &CatalogEntry) -> FileInfo {
        let mut info = FileInfo::new();
        info.name = file_name_to_string(entry.name);
        info.file_type = entry.file_type & 0x7f;
        info.type_char = type_char(entry.file_type);
        info.locked = entry.file_type & 0x80 > 0;
        info.blocks = entry.sectors;
        // sector aligned estimate, the T/S list accounts for the 1
        info.size = match entry.sectors {
            0 => 0,
            s => (s as usize - 1) * 256
        };
        info.ts_list = [entry.tsl_track,entry.tsl_sector];
        info
    }
    pub(crate) fn dos_find(&self,name: &str) -> Result<FileInfo,DYNERR> {
        let (_ts,_idx,entry) = self.find_entry(name)?;
        Ok(self.dos33_info_from_entry(&entry))
    }

    // T/S list traversal

    /// Gather the file contents behind a T/S list chain.  A zero pair
    /// followed by more data reads back as 256 zero bytes; trailing zero
    /// pairs terminate the data.
    fn read_file_data(&self,ts_list: [u8;2]) -> Result<Vec<u8>,DYNERR> {
        let mut ans: Vec<u8> = Vec::new();
        let mut pending_holes: usize = 0;
        let mut data_sectors: usize = 0;
        let mut ts = ts_list;
        for _try in 0..MAX_TSLIST_REPS {
            self.check_ts(ts)?;
            let buf = self.read_sector(ts[0],ts[1])?;
            let tslist = TrackSectorList::from_bytes(&buf);
            for pair in tslist.pairs {
                if pair == [0,0] {
                    pending_holes += 1;
                    continue;
                }
                self.check_ts(pair)?;
                data_sectors += pending_holes + 1;
                if data_sectors > MAX_TSLIST_REPS {
                    error!("file exceeded {} sectors",MAX_TSLIST_REPS);
                    return Err(Box::new(Error::BadChain));
                }
                ans.resize(ans.len() + pending_holes*256,0);
                pending_holes = 0;
                ans.append(&mut self.read_sector(pair[0],pair[1])?);
            }
            ts = [tslist.next_track,tslist.next_sector];
            if ts == [0,0] {
                return Ok(ans);
            }
        }
        error!("T/S list chain exceeded {} sectors",MAX_TSLIST_REPS);
        Err(Box::new(Error::BadChain))
    }
    pub(crate) fn dos_extract(&self,name: &str) -> Result<Vec<u8>,DYNERR> {
        let (_ts,_idx,entry) = self.find_entry(name)?;
        let dat = self.read_file_data([entry.tsl_track,entry.tsl_sector])?;
        // binary files carry (address,length) in the leading 4 bytes
        if entry.file_type & 0x7f == FileType::Binary as u8 && dat.len() >= 4 {
            let len = u16::from_le_bytes([dat[2],dat[3]]) as usize;
            if len > 0 && len <= dat.len() - 4 {
                return Ok(dat[4..4+len].to_vec());
            }
        }
        Ok(dat)
    }

    // mutating operations

    pub(crate) fn dos_inject(&mut self,name: &str,file_type: u8,aux: u16,dat: &[u8]) -> STDRESULT {
        if name.len() == 0 || name.len() > 30 {
            return Err(Box::new(Error::InvalidArgument));
        }
        match self.find_entry(name) {
            Ok(_) => return Err(Box::new(Error::DuplicateFilename)),
            Err(e) => match e.downcast_ref::<Error>() {
                Some(Error::FileNotFound) => {},
                _ => return Err(e)
            }
        }
        let payload = match file_type & 0x7f == FileType::Binary as u8 {
            true => {
                let load_addr = match aux {
                    0 => 0x2000,
                    a => a
                };
                let mut full = Vec::with_capacity(dat.len() + 4);
                full.extend_from_slice(&u16::to_le_bytes(load_addr));
                full.extend_from_slice(&u16::to_le_bytes(dat.len() as u16));
                full.extend_from_slice(dat);
                full
            },
            false => dat.to_vec()
        };
        let data_sectors = match payload.len() {
            0 => 1,
            n => (n + 255) / 256
        };
        if data_sectors > MAX_TSLIST_REPS {
            // files past the chain cap could never be read back
            return Err(Box::new(Error::Range));
        }
        let tslist_sectors = 1 + (data_sectors - 1) / MAX_PAIRS;
        if data_sectors + tslist_sectors > self.dos_num_free()? as usize {
            return Err(Box::new(Error::DiskFull));
        }
        // lay down the data and the T/S list as we go
        let mut tslist = TrackSectorList::new();
        let mut tslist_ts = self.alloc_sector()?;
        let mut allocated = vec![tslist_ts];
        let mut p = 0;
        for s in 0..data_sectors {
            let data_ts = match self.alloc_sector() {
                Ok(ts) => ts,
                Err(e) => {
                    self.release_sectors(&allocated);
                    return Err(e);
                }
            };
            allocated.push(data_ts);
            let mut buf = vec![0;256];
            let start = s*256;
            if start < payload.len() {
                let end = usize::min(start+256,payload.len());
                buf[0..end-start].copy_from_slice(&payload[start..end]);
            }
            self.write_sector(data_ts[0],data_ts[1],&buf)?;
            tslist.pairs[p] = data_ts;
            p += 1;
            if p == MAX_PAIRS && s+1 < data_sectors {
                // list spilled over to another sector
                let next_ts = match self.alloc_sector() {
                    Ok(ts) => ts,
                    Err(e) => {
                        self.release_sectors(&allocated);
                        return Err(e);
                    }
                };
                allocated.push(next_ts);
                tslist.next_track = next_ts[0];
                tslist.next_sector = next_ts[1];
                self.write_sector(tslist_ts[0],tslist_ts[1],&tslist.to_bytes())?;
                tslist_ts = next_ts;
                tslist = TrackSectorList::new();
                tslist.sector_base = (s+1) as u16;
                p = 0;
            }
        }
        self.write_sector(tslist_ts[0],tslist_ts[1],&tslist.to_bytes())?;
        // hook the file into the catalog
        let first_list = allocated[0];
        match self.add_catalog_entry(name,file_type,first_list,(data_sectors+tslist_sectors) as u16) {
            Ok(()) => self.flush_vtoc(),
            Err(e) => {
                self.release_sectors(&allocated);
                self.flush_vtoc()?;
                Err(e)
            }
        }
    }
    fn add_catalog_entry(&mut self,name: &str,file_type: u8,tslist_ts: [u8;2],sectors: u16) -> STDRESULT {
        let vtoc = self.vtoc.as_ref().ok_or(Error::FileSystemMismatch)?;
        let mut ts = [vtoc.catalog_track,vtoc.catalog_sector];
        for _try in 0..MAX_CATALOG_REPS {
            self.check_ts(ts)?;
            let buf = self.read_sector(ts[0],ts[1])?;
            let mut cat = CatalogSector::from_bytes(&buf);
            for e in 0..ENTRIES_PER_SECTOR {
                if !cat.entries[e].is_in_use() {
                    cat.entries[e] = CatalogEntry {
                        tsl_track: tslist_ts[0],
                        tsl_sector: tslist_ts[1],
                        file_type,
                        name: string_to_file_name(name),
                        sectors
                    };
                    return self.write_sector(ts[0],ts[1],&cat.to_bytes());
                }
            }
            ts = [cat.next_track,cat.next_sector];
            if ts == [0,0] {
                debug!("catalog is full");
                return Err(Box::new(Error::DiskFull));
            }
        }
        error!("catalog chain exceeded {} sectors",MAX_CATALOG_REPS);
        Err(Box::new(Error::BadChain))
    }
    pub(crate) fn dos_delete(&mut self,name: &str) -> STDRESULT {
        let (cat_ts,idx,entry) = self.find_entry(name)?;
        if entry.file_type & 0x80 > 0 {
            return Err(Box::new(Error::WriteProtected));
        }
        // free every data sector and the list sectors themselves
        let mut ts = [entry.tsl_track,entry.tsl_sector];
        let mut done = false;
        for _try in 0..MAX_TSLIST_REPS {
            self.check_ts(ts)?;
            let buf = self.read_sector(ts[0],ts[1])?;
            let tslist = TrackSectorList::from_bytes(&buf);
            for pair in tslist.pairs {
                if pair[0] > 0 && pair[0] < 0xff {
                    self.free_sector(pair[0],pair[1]);
                }
            }
            self.free_sector(ts[0],ts[1]);
            ts = [tslist.next_track,tslist.next_sector];
            if ts == [0,0] {
                done = true;
                break;
            }
        }
        if !done {
            error!("T/S list chain exceeded {} sectors",MAX_TSLIST_REPS);
            return Err(Box::new(Error::BadChain));
        }
        // stamp the entry deleted, keeping the name recoverable
        let buf = self.read_sector(cat_ts[0],cat_ts[1])?;
        let mut cat = CatalogSector::from_bytes(&buf);
        cat.entries[idx].name[29] = cat.entries[idx].tsl_track;
        cat.entries[idx].tsl_track = 0xff;
        self.write_sector(cat_ts[0],cat_ts[1],&cat.to_bytes())?;
        self.flush_vtoc()
    }
    pub(crate) fn dos_rename(&mut self,old_name: &str,new_name: &str) -> STDRESULT {
        if new_name.len() == 0 || new_name.len() > 30 {
            return Err(Box::new(Error::InvalidArgument));
        }
        if self.find_entry(new_name).is_ok() {
            return Err(Box::new(Error::DuplicateFilename));
        }
        let (cat_ts,idx,entry) = self.find_entry(old_name)?;
        if entry.file_type & 0x80 > 0 {
            return Err(Box::new(Error::WriteProtected));
        }
        let buf = self.read_sector(cat_ts[0],cat_ts[1])?;
        let mut cat = CatalogSector::from_bytes(&buf);
        cat.entries[idx].name = string_to_file_name(new_name);
        self.write_sector(cat_ts[0],cat_ts[1],&cat.to_bytes())
    }
    pub(crate) fn dos_set_locked(&mut self,name: &str,locked: bool) -> STDRESULT {
        let (cat_ts,idx,_entry) = self.find_entry(name)?;
        let buf = self.read_sector(cat_ts[0],cat_ts[1])?;
        let mut cat = CatalogSector::from_bytes(&buf);
        cat.entries[idx].file_type = match locked {
            true => cat.entries[idx].file_type | 0x80,
            false => cat.entries[idx].file_type & 0x7f
        };
        self.write_sector(cat_ts[0],cat_ts[1],&cat.to_bytes())
    }
}
