// test of the revolution solver and bit merger
use fluxkit::flux::{solver,merge,Error};

fn std_options() -> solver::RevolutionOptions {
    solver::RevolutionOptions {
        nominal_rpm: 300.0,
        sample_rate_hz: 24_000_000.0,
        ..Default::default()
    }
}

const REV: u32 = 4_800_000;

#[test]
fn supplied_index() {
    let flux = vec![REV;5];
    let index: Vec<u64> = (0..6).map(|i| i as u64 * REV as u64).collect();
    let result = solver::solve(&flux,Some(&index),&std_options()).expect("solve failed");
    assert_eq!(result.revolutions.len(),5);
    for rev in &result.revolutions {
        assert_eq!(rev.duration_us,200_000.0);
        assert_eq!(rev.rpm,300.0);
        assert_eq!(rev.drift_us,0.0);
        assert_eq!(rev.quality,100);
        assert!(rev.index_valid);
    }
    assert_eq!(result.overall_quality,100);
    assert!(result.timing_stable);
    assert!(result.index_consistent);
    assert_eq!(result.best_revolution,0);
    assert_eq!(result.average_rpm,300.0);
    assert_eq!(result.rpm_variance,0.0);
}

#[test]
fn inferred_index_matches_supplied() {
    let flux = vec![REV;5];
    let index: Vec<u64> = (0..6).map(|i| i as u64 * REV as u64).collect();
    let supplied = solver::solve(&flux,Some(&index),&std_options()).expect("solve failed");
    let inferred = solver::solve(&flux,None,&std_options()).expect("solve failed");
    assert_eq!(inferred.revolutions.len(),supplied.revolutions.len());
    for (a,b) in inferred.revolutions.iter().zip(supplied.revolutions.iter()) {
        assert!(a.start_sample.abs_diff(b.start_sample) <= 1);
        assert!(a.end_sample.abs_diff(b.end_sample) <= 1);
    }
}

#[test]
fn boundary_invariants() {
    // wobble the revolutions a little and check the seams
    let flux: Vec<u32> = vec![REV+1200,REV-800,REV+300,REV-100,REV];
    let result = solver::solve(&flux,None,&std_options()).expect("solve failed");
    let total: u64 = flux.iter().map(|v| *v as u64).sum();
    for rev in &result.revolutions {
        assert!(rev.start_sample < rev.end_sample);
    }
    for pair in result.revolutions.windows(2) {
        assert_eq!(pair[0].end_sample,pair[1].start_sample);
    }
    let duration_sum: f64 = result.revolutions.iter().map(|r| r.duration_us).sum();
    let expected = total as f64 / 24_000_000.0 * 1_000_000.0;
    assert!((duration_sum - expected).abs() < 1e-6 * expected);
}

#[test]
fn insufficient_data() {
    // far too short a capture for even one revolution
    let flux = vec![100_u32;3];
    let mut options = std_options();
    options.allow_missing_index = false;
    match solver::solve(&flux,None,&options) {
        Ok(_) => panic!("should be insufficient"),
        Err(e) => assert!(matches!(e,Error::InsufficientData))
    }
    // the fallback partition also comes up short here
    options.allow_missing_index = true;
    match solver::solve(&flux,None,&options) {
        Ok(_) => panic!("should be insufficient"),
        Err(e) => assert!(matches!(e,Error::InsufficientData))
    }
}

#[test]
fn minimum_boundaries() {
    let flux = vec![REV;2];
    let mut options = std_options();
    options.allow_missing_index = false;
    // three boundaries make exactly min_revolutions
    let index: Vec<u64> = vec![0,REV as u64,2*REV as u64];
    let result = solver::solve(&flux,Some(&index),&options).expect("solve failed");
    assert_eq!(result.revolutions.len(),2);
    // one fewer fails
    match solver::solve(&flux,Some(&index[0..2]),&options) {
        Ok(_) => panic!("should be insufficient"),
        Err(e) => assert!(matches!(e,Error::InsufficientData))
    }
}

#[test]
fn off_speed_quality() {
    // 1% fast: quality drops to 80 under the default 5% tolerance
    let fast = (REV as f64 * 0.99) as u32;
    let flux = vec![fast;4];
    let index: Vec<u64> = (0..5).map(|i| i as u64 * fast as u64).collect();
    let result = solver::solve(&flux,Some(&index),&std_options()).expect("solve failed");
    for rev in &result.revolutions {
        assert!(rev.rpm > 300.0);
        assert!(rev.drift_us < 0.0);
        assert!(rev.quality >= 79 && rev.quality <= 81);
    }
    // 10% fast lands outside tolerance entirely
    let wild = (REV as f64 * 0.9) as u32;
    let flux = vec![wild;4];
    let index: Vec<u64> = (0..5).map(|i| i as u64 * wild as u64).collect();
    let result = solver::solve(&flux,Some(&index),&std_options()).expect("solve failed");
    assert_eq!(result.overall_quality,0);
}

#[test]
fn extraction() {
    let flux: Vec<u32> = (0..10).map(|i| REV/2 + i).collect();
    let index: Vec<u64> = vec![0,
        flux[0] as u64 + flux[1] as u64,
        flux[0] as u64 + flux[1] as u64 + flux[2] as u64 + flux[3] as u64];
    let result = solver::solve(&flux,Some(&index),&std_options()).expect("solve failed");
    let mut out = vec![0_u32;10];
    let written = solver::extract(&flux,&result,1,&mut out).expect("extract failed");
    assert_eq!(written,2);
    assert_eq!(&out[0..2],&flux[2..4]);
    // too small a buffer reports the required size
    let mut small = vec![0_u32;1];
    match solver::extract(&flux,&result,1,&mut small) {
        Ok(_) => panic!("buffer should be too small"),
        Err(Error::BufferTooSmall(needed)) => assert_eq!(needed,2),
        Err(_) => panic!("wrong error")
    }
    match solver::extract(&flux,&result,99,&mut out) {
        Ok(_) => panic!("index should be out of range"),
        Err(e) => assert!(matches!(e,Error::OutOfRange))
    }
}

#[test]
fn solver_json() {
    let flux = vec![REV;5];
    let result = solver::solve(&flux,None,&std_options()).expect("solve failed");
    let parsed = json::parse(&result.to_json(2)).expect("bad json");
    assert_eq!(parsed["count"].as_usize(),Some(5));
    assert_eq!(parsed["overall_quality"].as_u8(),Some(100));
    assert_eq!(parsed["revolutions"].len(),5);
}

// merger

#[test]
fn merge_tie() {
    let (a,b) = ([0xff_u8],[0x00_u8]);
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&b),Some(&a),Some(&b)];
    let merged = merge::merge(&revs,8).expect("merge failed");
    assert_eq!(merged.data,vec![0x00]);
    assert_eq!(merged.weak_bits,vec![0xff]);
    assert_eq!(merged.weak_count,8);
    assert_eq!(merged.confidence,vec![50]);
}

#[test]
fn merge_majority() {
    let (a,b) = ([0xf0_u8],[0x0f_u8]);
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&a),Some(&a),Some(&b)];
    let merged = merge::merge(&revs,8).expect("merge failed");
    // three of four agree everywhere, right at the weak threshold
    assert_eq!(merged.data,vec![0xf0]);
    assert_eq!(merged.weak_count,0);
    assert_eq!(merged.confidence,vec![75]);
}

#[test]
fn merge_weak_split() {
    // three against two is under the three quarter agreement bar
    let (a,b) = ([0x80_u8],[0x00_u8]);
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&a),Some(&a),Some(&b),Some(&b)];
    let merged = merge::merge(&revs,8).expect("merge failed");
    assert_eq!(merged.data,vec![0x80]);
    assert_eq!(merged.weak_bits,vec![0x80]);
    assert_eq!(merged.weak_count,1);
}

#[test]
fn merge_skips_missing() {
    let a = [0xaa_u8];
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),None,Some(&a)];
    let merged = merge::merge(&revs,8).expect("merge failed");
    assert_eq!(merged.data,vec![0xaa]);
    assert_eq!(merged.weak_count,0);
}

#[test]
fn merge_needs_two() {
    let a = [0xaa_u8];
    let revs: Vec<Option<&[u8]>> = vec![Some(&a)];
    match merge::merge(&revs,8) {
        Ok(_) => panic!("one revolution cannot merge"),
        Err(e) => assert!(matches!(e,Error::InvalidArgument))
    }
}

#[test]
fn detect_weak_idempotent() {
    let (a,b) = ([0b1100_1010_u8],[0b1100_0110_u8]);
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&b)];
    let (mask1,count1) = merge::detect_weak(&revs,8).expect("detect failed");
    let (mask2,count2) = merge::detect_weak(&revs,8).expect("detect failed");
    assert_eq!(mask1,mask2);
    assert_eq!(count1,count2);
    // bits 4 and 5 disagree
    assert_eq!(mask1,vec![0b0000_1100]);
    assert_eq!(count1,2);
}

#[test]
fn detect_weak_unanimous() {
    let a = [0x5a_u8,0xa5];
    let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&a),Some(&a)];
    let (mask,count) = merge::detect_weak(&revs,16).expect("detect failed");
    assert_eq!(mask,vec![0,0]);
    assert_eq!(count,0);
}
