// test of the format registry and detection ranking
use fluxkit::img::{self,FormatType,Platform};
use fluxkit::img::profiles::{hfe,woz,dc42,d88,atr};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn hfe_then_woz_then_unknown() {
    init_logging();
    // an HFE signature with a valid encoding id
    let mut buf = vec![0_u8;1024];
    buf[0..8].copy_from_slice(b"HXCPICFE");
    buf[11] = 0x00; // ISO MFM
    buf[36] = 0x00;
    assert_eq!(img::identify(&buf),FormatType::Hfe);
    // overwrite with the WOZ signature and magic
    buf[0..4].copy_from_slice(b"WOZ1");
    buf[4..8].copy_from_slice(&[0xff,0x0a,0x0d,0x0a]);
    assert_eq!(img::identify(&buf),FormatType::Woz);
    // a zeroed buffer matches nothing
    let zeros = vec![0_u8;1024];
    let detection = img::detect(&zeros);
    assert_eq!(detection.best,FormatType::Unknown);
    assert_eq!(detection.best_score,0);
    assert_eq!(detection.matches.len(),0);
}

#[test]
fn ranking_and_threshold() {
    let mut buf = vec![0_u8;1024];
    buf[0..8].copy_from_slice(b"HXCPICFE");
    buf[9] = 40;  // tracks
    buf[10] = 1;  // sides
    buf[12..14].copy_from_slice(&u16::to_le_bytes(250));
    buf[16] = 0x07;
    let detection = img::detect(&buf);
    assert_eq!(detection.best,FormatType::Hfe);
    assert!(detection.best_score >= img::HIGH_CONFIDENCE);
    assert!(detection.matches.len() >= 1 && detection.matches.len() <= img::MAX_MATCHES);
    // ranked descending
    for pair in detection.matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for m in &detection.matches {
        assert!(m.score >= img::MIN_SCORE);
    }
    assert_eq!(img::identify(&vec![]),FormatType::Unknown);
}

#[test]
fn creators_identify_themselves() {
    init_logging();
    assert_eq!(img::identify(&hfe::create_header(35,1,250)),FormatType::Hfe);
    assert_eq!(img::identify(&woz::create_header(1)),FormatType::Woz);
    assert_eq!(img::identify(&dc42::create_header("blank",409600,0,0)),FormatType::Dc42);
    assert_eq!(img::identify(&d88::create_header("blank",d88::TYPE_2D)),FormatType::D88);
    assert_eq!(img::identify(&atr::create_header(92160,128)),FormatType::Atr);
}

#[test]
fn descriptors() {
    let desc = img::get_descriptor(FormatType::Hfe).expect("missing descriptor");
    assert_eq!(desc.name,"HFE");
    assert_eq!(desc.min_file_size,512);
    let desc = img::get_descriptor(FormatType::Adf).expect("missing descriptor");
    assert_eq!(desc.platform,Platform::Amiga);
    assert_eq!(desc.max_file_size,1802240);
    assert!(img::get_descriptor(FormatType::Unknown).is_none());
    assert_eq!(img::REGISTRY.len(),26);
    assert_eq!(FormatType::Woz.to_string(),"WOZ");
    assert_eq!("woz".parse::<FormatType>().expect("parse failed"),FormatType::Woz);
}

#[test]
fn platform_lookup() {
    let apple = img::get_by_platform(Platform::AppleII);
    assert!(apple.contains(&FormatType::Woz));
    assert!(apple.contains(&FormatType::A2r));
    assert!(apple.contains(&FormatType::Nib));
    assert_eq!(apple.len(),3);
    let ddr = img::get_by_platform(Platform::Ddr);
    assert_eq!(ddr,vec![FormatType::Kc85]);
}

#[test]
fn write_and_convert_flags() {
    assert!(img::can_write(FormatType::Hfe));
    assert!(!img::can_write(FormatType::Td0));
    assert!(img::can_convert(FormatType::Td0));
    assert!(!img::can_write(FormatType::Unknown));
}

#[test]
fn probe_single_matches_detect() {
    let mut buf = vec![0_u8;1024];
    buf[0..8].copy_from_slice(b"GCR-1541");
    buf[9] = 84;
    buf[10..12].copy_from_slice(&u16::to_le_bytes(7000));
    let score = img::probe_single(FormatType::G64,&buf);
    assert!(score >= img::MIN_SCORE);
    let detection = img::detect(&buf);
    assert_eq!(detection.best,FormatType::G64);
    assert_eq!(detection.best_score,score);
}

#[test]
fn apple_dsk_profile() {
    // a freshly formatted DOS 3.3 image should light up the DSK probe
    let mut disk = fluxkit::fs::Disk::create_dos33(254).expect("failed to format");
    let bytes = disk.to_bytes();
    let score = img::probe_single(FormatType::Dsk,&bytes);
    assert!(score >= img::HIGH_CONFIDENCE);
    assert_eq!(img::identify(&bytes),FormatType::Dsk);
}
