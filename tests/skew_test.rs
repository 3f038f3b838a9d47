// test of sector order tables and whole image conversion
use fluxkit::bios::skew::{self,SectorOrder};
use fluxkit::fs::Disk;

#[test]
fn permutations_invert() {
    for order in [SectorOrder::Dos,SectorOrder::ProDos,SectorOrder::Physical,SectorOrder::Dos32] {
        let fwd = order.map();
        let inv = order.inverse_map();
        assert_eq!(fwd.len(),inv.len());
        for s in 0..fwd.len() {
            assert_eq!(inv[fwd[s]],s);
            assert_eq!(fwd[inv[s]],s);
        }
    }
}

#[test]
fn authoritative_tables() {
    assert_eq!(SectorOrder::Dos.map(),&[0,13,11,9,7,5,3,1,14,12,10,8,6,4,2,15]);
    assert_eq!(SectorOrder::ProDos.map(),&[0,2,4,6,8,10,12,14,1,3,5,7,9,11,13,15]);
    assert_eq!(SectorOrder::Physical.map(),&[0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15]);
    assert_eq!(SectorOrder::Dos32.map(),&[0,10,7,4,1,11,8,5,2,12,9,6,3]);
}

#[test]
fn convert_one_track() {
    // fill slot n with byte n so every sector is distinguishable
    let mut buf: Vec<u8> = (0..4096_usize).map(|i| (i/256) as u8).collect();
    let original = buf.clone();
    skew::convert_order(&mut buf,SectorOrder::Dos,SectorOrder::ProDos).expect("convert failed");
    // sectors 0 and 15 stay put
    assert_eq!(buf[0..256],original[0..256]);
    assert_eq!(buf[15*256..],original[15*256..]);
    // the other fourteen move per the tables
    let dos = SectorOrder::Dos.map();
    let pro = SectorOrder::ProDos.map();
    for lsec in 0..16 {
        assert_eq!(buf[pro[lsec]*256],original[dos[lsec]*256]);
    }
    // and the round trip is the identity
    skew::convert_order(&mut buf,SectorOrder::ProDos,SectorOrder::Dos).expect("convert failed");
    assert_eq!(buf,original);
}

#[test]
fn convert_whole_image() {
    let mut buf: Vec<u8> = (0..143360_usize).map(|i| ((i/256) % 256) as u8).collect();
    let original = buf.clone();
    skew::convert_order(&mut buf,SectorOrder::Dos,SectorOrder::ProDos).expect("convert failed");
    assert_ne!(buf,original);
    skew::convert_order(&mut buf,SectorOrder::ProDos,SectorOrder::Dos).expect("convert failed");
    assert_eq!(buf,original);
}

#[test]
fn thirteen_sector_orders_do_not_convert() {
    let mut buf = vec![0;4096];
    match skew::convert_order(&mut buf,SectorOrder::Dos32,SectorOrder::Dos) {
        Ok(_) => panic!("13 sector order should refuse conversion"),
        Err(e) => assert_eq!(e.to_string(),"sector count not compatible with this order")
    }
}

#[test]
fn sector_io_uses_order_map() {
    // the physical slot of T0 logical sector 1 is 13 on a DOS order disk
    let mut disk = Disk::create_dos33(254).expect("failed to format");
    let pattern = vec![0xab;256];
    disk.write_sector(0,1,&pattern).expect("write failed");
    let bytes = disk.to_bytes();
    assert_eq!(bytes[13*256..13*256+256],pattern[..]);
}
