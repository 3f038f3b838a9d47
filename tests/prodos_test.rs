// test of the ProDOS file system engine
use fluxkit::fs::{Disk,FileSystemType};
use fluxkit::bios::skew::SectorOrder;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn format() {
    init_logging();
    let disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    // 280 minus 2 boot, 4 volume directory, 1 bitmap
    assert_eq!(disk.get_free().expect("no free count"),273);
    assert_eq!(disk.volume_name(),"/BLANK");
}

#[test]
fn detect_blank() {
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    let detection = Disk::detect(&disk.to_bytes()).expect("detection failed");
    assert_eq!(detection.fs_type,FileSystemType::ProDos);
    assert_eq!(detection.order,SectorOrder::ProDos);
    assert_eq!(detection.confidence,95);
    assert_eq!(detection.volume_name,"BLANK");
}

#[test]
fn seedling_extract() {
    init_logging();
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    disk.inject("/BLANK/README",0x04,0,"hi\n".as_bytes()).expect("inject failed");
    let info = disk.find("/BLANK/README").expect("find failed");
    assert_eq!(info.storage_type,1);
    assert_eq!(info.blocks,1);
    assert_eq!(info.size,3);
    assert!(info.created.is_some());
    assert_eq!(disk.extract("/BLANK/README").expect("extract failed"),vec![0x68,0x69,0x0a]);
    // also reachable without the volume prefix
    assert_eq!(disk.extract("README").expect("extract failed"),vec![0x68,0x69,0x0a]);
}

#[test]
fn storage_type_thresholds() {
    let mut disk = Disk::create_prodos("THRESH",280).expect("failed to format");
    // 512 and 513 bytes sit on the seedling/sapling boundary
    disk.inject("EDGE1",0x06,0x2000,&vec![7;512]).expect("inject failed");
    let info = disk.find("EDGE1").expect("find failed");
    assert_eq!((info.storage_type,info.blocks),(1,1));
    disk.inject("EDGE2",0x06,0x2000,&vec![7;513]).expect("inject failed");
    let info = disk.find("EDGE2").expect("find failed");
    assert_eq!((info.storage_type,info.blocks),(2,3));
    assert_eq!(disk.extract("EDGE2").expect("extract failed"),vec![7;513]);
}

#[test]
fn sapling_tree_thresholds() {
    let mut disk = Disk::create_prodos("BIGTREE",280).expect("failed to format");
    let free0 = disk.get_free().expect("no free count");
    // 128K is the largest sapling
    let payload: Vec<u8> = (0..131072_usize).map(|i| (i%253) as u8).collect();
    disk.inject("SAP",0x06,0,&payload).expect("inject failed");
    let info = disk.find("SAP").expect("find failed");
    assert_eq!(info.storage_type,2);
    assert_eq!(info.blocks,257);
    assert_eq!(disk.extract("SAP").expect("extract failed"),payload);
    disk.delete("SAP").expect("delete failed");
    assert_eq!(disk.get_free().expect("no free count"),free0);
    // one more byte forces a tree
    let payload: Vec<u8> = (0..131073_usize).map(|i| (i%241) as u8).collect();
    disk.inject("TREE",0x06,0,&payload).expect("inject failed");
    let info = disk.find("TREE").expect("find failed");
    assert_eq!(info.storage_type,3);
    assert_eq!(info.blocks,260);
    assert_eq!(disk.extract("TREE").expect("extract failed"),payload);
    disk.delete("TREE").expect("delete failed");
    assert_eq!(disk.get_free().expect("no free count"),free0);
}

#[test]
fn empty_file() {
    // an empty file is a seedling with one allocated block and EOF 0
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    disk.inject("VOID",0x04,0,&vec![]).expect("inject failed");
    let info = disk.find("VOID").expect("find failed");
    assert_eq!((info.storage_type,info.blocks,info.size),(1,1,0));
    assert_eq!(disk.extract("VOID").expect("extract failed").len(),0);
}

#[test]
fn subdirectories() {
    init_logging();
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    disk.mkdir("/BLANK/SUB").expect("mkdir failed");
    let listing = disk.read_dir("").expect("list failed");
    assert_eq!(listing.len(),1);
    assert!(listing[0].is_directory);
    assert_eq!(listing[0].file_type,0x0f);
    disk.inject("/BLANK/SUB/DATA",0x04,0,"deep\n".as_bytes()).expect("inject failed");
    let listing = disk.read_dir("/BLANK/SUB").expect("list failed");
    assert_eq!(listing.len(),1);
    assert_eq!(listing[0].name,"DATA");
    assert_eq!(disk.extract("/BLANK/SUB/DATA").expect("extract failed"),"deep\n".as_bytes());
    // a second level and a rename inside it
    disk.mkdir("/BLANK/SUB/DEEPER").expect("mkdir failed");
    disk.inject("/BLANK/SUB/DEEPER/LEAF",0x04,0,"leaf".as_bytes()).expect("inject failed");
    disk.rename("/BLANK/SUB/DEEPER/LEAF","FROND").expect("rename failed");
    assert_eq!(disk.extract("/BLANK/SUB/DEEPER/FROND").expect("extract failed"),"leaf".as_bytes());
    match disk.mkdir("/BLANK/SUB") {
        Ok(_) => panic!("mkdir should collide"),
        Err(e) => assert_eq!(e.to_string(),"DUPLICATE FILENAME")
    }
}

#[test]
fn locked_files() {
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    disk.inject("KEEPER",0x04,0,&vec![1;100]).expect("inject failed");
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
fn name_rules() {
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    disk.inject("GOOD.NAME",0x04,0,&vec![1]).expect("inject failed");
    match disk.inject("9BAD",0x04,0,&vec![1]) {
        Ok(_) => panic!("name starting with a digit should fail"),
        Err(e) => assert_eq!(e.to_string(),"invalid argument")
    }
    match disk.inject("WAY.TOO.LONG.FOR.PRODOS",0x04,0,&vec![1]) {
        Ok(_) => panic!("long name should fail"),
        Err(e) => assert_eq!(e.to_string(),"invalid argument")
    }
    // case folds on the way in and on lookup
    disk.inject("mixed",0x04,0,&vec![2]).expect("inject failed");
    assert_eq!(disk.find("MIXED").expect("find failed").name,"MIXED");
    match disk.inject("MIXED",0x04,0,&vec![3]) {
        Ok(_) => panic!("inject should collide"),
        Err(e) => assert_eq!(e.to_string(),"DUPLICATE FILENAME")
    }
}

#[test]
fn block_accounting_invariant() {
    // entry blocks + directory 4 + bitmap 1 + boot 2 + free = total
    let mut disk = Disk::create_prodos("COUNT",280).expect("failed to format");
    disk.inject("A",0x04,0,&vec![1;100]).expect("inject failed");
    disk.inject("B",0x06,0,&vec![2;2000]).expect("inject failed");
    disk.mkdir("C").expect("mkdir failed");
    let used: u16 = disk.read_dir("").expect("list failed").iter().map(|e| e.blocks).sum();
    assert_eq!(used + 4 + 1 + 2 + disk.get_free().expect("no free count"),280);
}

#[test]
fn block_addressing() {
    let mut disk = Disk::create_prodos("BLANK",280).expect("failed to format");
    let pattern: Vec<u8> = (0..512_usize).map(|i| (i%256) as u8).collect();
    disk.write_block(200,&pattern).expect("write failed");
    assert_eq!(disk.read_block(200).expect("read failed"),pattern);
    match disk.read_block(280) {
        Ok(_) => panic!("block out of range"),
        Err(e) => assert_eq!(e.to_string(),"RANGE ERROR")
    }
}

#[test]
fn volume_report() {
    let mut disk = Disk::create_prodos("REPORT",280).expect("failed to format");
    disk.inject("NOTES",0x04,0,"text".as_bytes()).expect("inject failed");
    let report = disk.to_json(0);
    assert!(report.contains("\"REPORT\""));
    assert!(report.contains("\"NOTES\""));
    assert!(report.contains("\"TXT\""));
    let parsed = json::parse(&report).expect("bad json");
    assert_eq!(parsed["total_blocks"].as_u16(),Some(280));
}

#[test]
fn mkdir_only_on_prodos() {
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    match disk.mkdir("SUB") {
        Ok(_) => panic!("DOS 3.3 cannot make directories"),
        Err(e) => assert_eq!(e.to_string(),"file system not compatible with request")
    }
}
