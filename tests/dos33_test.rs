// test of the DOS 3.x file system engine
use fluxkit::fs::{Disk,FileSystemType};
use fluxkit::bios::skew::SectorOrder;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn format() {
    init_logging();
    let disk = Disk::create_dos33(254).expect("failed to format");
    // 560 total, minus boot sectors 0-2 and all of track 17
    assert_eq!(disk.get_free().expect("no free count"),541);
    assert_eq!(disk.geometry(),(35,16));
    assert_eq!(disk.volume_name(),"DISK VOLUME 254");
    assert_eq!(disk.read_dir("").expect("catalog failed").len(),0);
}

#[test]
fn detect_blank() {
    let mut disk = Disk::create_dos33(100).expect("failed to format");
    let detection = Disk::detect(&disk.to_bytes()).expect("detection failed");
    assert_eq!(detection.fs_type,FileSystemType::Dos33);
    assert_eq!(detection.order,SectorOrder::Dos);
    assert_eq!(detection.tracks,35);
    assert_eq!(detection.sectors_per_track,16);
    assert_eq!(detection.confidence,90);
    assert_eq!(detection.volume_name,"DISK VOLUME 100");
}

#[test]
fn detect_dos32() {
    // 13 sector images carry the same VTOC with sectors = 13
    let mut img = vec![0;116480];
    let vtoc = 17*13*256;
    img[vtoc+0x01] = 17; // catalog track
    img[vtoc+0x02] = 12; // catalog sector
    img[vtoc+0x03] = 2;  // DOS version
    img[vtoc+0x06] = 254;
    img[vtoc+0x34] = 35;
    img[vtoc+0x35] = 13;
    img[vtoc+0x36] = 0;
    img[vtoc+0x37] = 1;
    let detection = Disk::detect(&img).expect("detection failed");
    assert_eq!(detection.fs_type,FileSystemType::Dos32);
    assert_eq!(detection.order,SectorOrder::Dos32);
    assert_eq!(detection.sectors_per_track,13);
}

#[test]
fn create_and_list() {
    init_logging();
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    assert_eq!(disk.get_free().expect("no free count"),541);
    disk.inject("HELLO",0x02,0,&vec![0;256]).expect("inject failed");
    let listing = disk.read_dir("").expect("catalog failed");
    assert_eq!(listing.len(),1);
    assert_eq!(listing[0].name,"HELLO");
    assert_eq!(listing[0].type_char,'A');
    assert_eq!(listing[0].locked,false);
    // one data sector plus one T/S list
    assert_eq!(listing[0].blocks,2);
    assert_eq!(disk.get_free().expect("no free count"),539);
}

#[test]
fn binary_round_trip() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    disk.inject("THECHIP",0x04,768,&vec![6,5,0,2]).expect("inject failed");
    // the 4 byte address/length header is stripped on the way out
    assert_eq!(disk.extract("THECHIP").expect("extract failed"),vec![6,5,0,2]);
    // survives a remount
    let bytes = disk.to_bytes();
    let disk2 = Disk::open(&bytes).expect("remount failed");
    assert_eq!(disk2.fs_type(),FileSystemType::Dos33);
    assert_eq!(disk2.extract("THECHIP").expect("extract failed"),vec![6,5,0,2]);
}

#[test]
fn multi_tslist_file() {
    // 157 data sectors forces a second T/S list sector
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    let payload: Vec<u8> = (0..40000_usize).map(|i| (i%251) as u8).collect();
    disk.inject("BIG",0x00,0,&payload).expect("inject failed");
    let info = disk.find("BIG").expect("find failed");
    assert_eq!(info.blocks,157+2);
    // text comes back sector aligned
    let recovered = disk.extract("BIG").expect("extract failed");
    assert_eq!(recovered.len(),157*256);
    assert_eq!(&recovered[0..40000],&payload[0..40000]);
    assert!(recovered[40000..].iter().all(|b| *b == 0));
}

#[test]
fn delete_restores_free() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    let free0 = disk.get_free().expect("no free count");
    disk.inject("DOOMED",0x00,0,&vec![1;1000]).expect("inject failed");
    let info = disk.find("DOOMED").expect("find failed");
    assert_eq!(disk.get_free().expect("no free count"),free0 - info.blocks);
    disk.delete("DOOMED").expect("delete failed");
    assert_eq!(disk.get_free().expect("no free count"),free0);
    match disk.find("DOOMED") {
        Ok(_) => panic!("deleted file still present"),
        Err(e) => assert_eq!(e.to_string(),"FILE NOT FOUND")
    }
}

#[test]
fn locked_files() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    disk.inject("KEEPER",0x00,0,&vec![1;100]).expect("inject failed");
    disk.set_locked("KEEPER",true).expect("lock failed");
    assert!(disk.find("KEEPER").expect("find failed").locked);
    match disk.delete("KEEPER") {
        Ok(_) => panic!("deleted a locked file"),
        Err(e) => assert_eq!(e.to_string(),"WRITE PROTECTED")
    }
    match disk.rename("KEEPER","FREED") {
        Ok(_) => panic!("renamed a locked file"),
        Err(e) => assert_eq!(e.to_string(),"WRITE PROTECTED")
    }
    disk.set_locked("KEEPER",false).expect("unlock failed");
    disk.delete("KEEPER").expect("delete failed");
}

#[test]
fn rename_and_collision() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    disk.inject("ALPHA",0x00,0,&vec![1;100]).expect("inject failed");
    disk.inject("BETA",0x00,0,&vec![2;100]).expect("inject failed");
    match disk.rename("ALPHA","BETA") {
        Ok(_) => panic!("rename should collide"),
        Err(e) => assert_eq!(e.to_string(),"DUPLICATE FILENAME")
    }
    match disk.inject("ALPHA",0x00,0,&vec![3;100]) {
        Ok(_) => panic!("inject should collide"),
        Err(e) => assert_eq!(e.to_string(),"DUPLICATE FILENAME")
    }
    disk.rename("ALPHA","GAMMA").expect("rename failed");
    disk.find("GAMMA").expect("renamed file missing");
    match disk.find("ALPHA") {
        Ok(_) => panic!("old name still present"),
        Err(e) => assert_eq!(e.to_string(),"FILE NOT FOUND")
    }
}

#[test]
fn catalog_full() {
    // 15 catalog sectors of 7 entries each hold 105 files
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    for i in 0..105 {
        disk.inject(&format!("F{}",i),0x00,0,&vec![0;10]).expect("inject failed");
    }
    let free = disk.get_free().expect("no free count");
    match disk.inject("F105",0x00,0,&vec![0;10]) {
        Ok(_) => panic!("the 106th file should not fit the catalog"),
        Err(e) => assert_eq!(e.to_string(),"DISK FULL")
    }
    // the rollback gave back everything the failed inject took
    assert_eq!(disk.get_free().expect("no free count"),free);
}

#[test]
fn out_of_space() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    let big: Vec<u8> = vec![0;0x7f00];
    disk.inject("F1",0x04,0x800,&big).expect("inject failed");
    disk.inject("F2",0x04,0x800,&big).expect("inject failed");
    disk.inject("F3",0x04,0x800,&big).expect("inject failed");
    disk.inject("F4",0x04,0x800,&big).expect("inject failed");
    match disk.inject("F5",0x04,0x800,&big) {
        Ok(_) => panic!("wrote but should be disk full"),
        Err(e) => assert_eq!(e.to_string(),"DISK FULL")
    }
}

#[test]
fn empty_file() {
    // an empty file still takes one zero filled data sector and a T/S list
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    disk.inject("VOID",0x00,0,&vec![]).expect("inject failed");
    assert_eq!(disk.find("VOID").expect("find failed").blocks,2);
    assert_eq!(disk.extract("VOID").expect("extract failed"),vec![0;256]);
}

#[test]
fn sector_addressing() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    let pattern: Vec<u8> = (0..256_usize).map(|i| i as u8).collect();
    disk.write_sector(3,7,&pattern).expect("write failed");
    assert_eq!(disk.read_sector(3,7).expect("read failed"),pattern);
    match disk.read_sector(35,0) {
        Ok(_) => panic!("track out of range"),
        Err(e) => assert_eq!(e.to_string(),"RANGE ERROR")
    }
    match disk.read_sector(0,16) {
        Ok(_) => panic!("sector out of range"),
        Err(e) => assert_eq!(e.to_string(),"RANGE ERROR")
    }
}

#[test]
fn free_accounting_invariant() {
    // free + used always comes to 560 on a standard disk
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    disk.inject("ONE",0x00,0,&vec![1;5000]).expect("inject failed");
    disk.inject("TWO",0x04,0,&vec![2;300]).expect("inject failed");
    let used: u16 = disk.read_dir("").expect("catalog failed").iter().map(|e| e.blocks).sum();
    let reserved = 16 + 3; // catalog track and boot sectors
    assert_eq!(disk.get_free().expect("no free count") + used + reserved,560);
}
