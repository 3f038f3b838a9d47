//! ## Revolution solver
//!
//! Segments a flux capture into disk rotations and scores each one.
//! Index pulse positions may be supplied by the caller; otherwise boundaries
//! are inferred by accumulating intervals until one nominal rotation has
//! passed, within a ten percent band.  When too few boundaries turn up and
//! the caller allows it, the stream is partitioned into equal nominal
//! rotations as a last resort.

use log::{debug,warn};
use super::Error;

pub const MAX_REVOLUTIONS: usize = 16;
pub const MIN_REVOLUTIONS: usize = 2;
pub const DEFAULT_TOLERANCE: f64 = 0.05;
pub const NOMINAL_RPM_300: f64 = 300.0;
pub const NOMINAL_RPM_360: f64 = 360.0;

/// RPM given a rotation time in microseconds
pub fn duration_to_rpm(duration_us: f64) -> f64 {
    match duration_us > 0.0 {
        true => 60_000_000.0 / duration_us,
        false => 0.0
    }
}

/// rotation time in microseconds given RPM
pub fn rpm_to_duration(rpm: f64) -> f64 {
    match rpm > 0.0 {
        true => 60_000_000.0 / rpm,
        false => 0.0
    }
}

pub fn rpm_in_tolerance(actual_rpm: f64,nominal_rpm: f64,tolerance: f64) -> bool {
    actual_rpm >= nominal_rpm * (1.0 - tolerance) && actual_rpm <= nominal_rpm * (1.0 + tolerance)
}

/// Options for revolution solving.  `Default` gives 300 RPM, 5% tolerance,
/// index inference enabled, equal partition fallback enabled.
#[derive(Clone,Copy)]
pub struct RevolutionOptions {
    /// expected spindle speed, 300 or 360
    pub nominal_rpm: f64,
    pub sample_rate_hz: f64,
    /// timing tolerance for quality scoring, fraction of nominal
    pub tolerance: f64,
    /// infer index boundaries from the flux stream when none are supplied
    pub use_index_pulse: bool,
    /// fall back to equal partitioning rather than failing
    pub allow_missing_index: bool,
    pub min_revolutions: usize,
    pub max_revolutions: usize
}

impl Default for RevolutionOptions {
    fn default() -> Self {
        Self {
            nominal_rpm: NOMINAL_RPM_300,
            sample_rate_hz: 24_000_000.0,
            tolerance: DEFAULT_TOLERANCE,
            use_index_pulse: true,
            allow_missing_index: true,
            min_revolutions: MIN_REVOLUTIONS,
            max_revolutions: MAX_REVOLUTIONS
        }
    }
}

/// One solved revolution.  `index_valid` records that a boundary was
/// identified, whether supplied or inferred; it does not promise a hardware
/// index pulse was seen.  Only post-processing ever clears it.
#[derive(Clone,Copy)]
pub struct RevolutionInfo {
    pub revolution: u32,
    pub index_position: u64,
    pub start_sample: u64,
    pub end_sample: u64,
    pub sample_count: u64,
    pub duration_us: f64,
    pub rpm: f64,
    pub drift_us: f64,
    pub quality: u8,
    pub index_valid: bool
}

/// The solved revolutions plus aggregate statistics.
#[derive(Clone)]
pub struct RevolutionResult {
    pub revolutions: Vec<RevolutionInfo>,
    pub average_rpm: f64,
    pub rpm_variance: f64,
    pub rpm_min: f64,
    pub rpm_max: f64,
    pub average_duration_us: f64,
    pub duration_variance: f64,
    /// every revolution has a valid boundary
    pub index_consistent: bool,
    /// standard deviation of duration under 0.5% of nominal
    pub timing_stable: bool,
    pub overall_quality: u8,
    pub best_revolution: u32
}

impl RevolutionResult {
    fn new() -> Self {
        Self {
            revolutions: Vec::new(),
            average_rpm: 0.0,
            rpm_variance: 0.0,
            rpm_min: 0.0,
            rpm_max: 0.0,
            average_duration_us: 0.0,
            duration_variance: 0.0,
            index_consistent: false,
            timing_stable: false,
            overall_quality: 0,
            best_revolution: 0
        }
    }
    /// Render the result as JSON, if indent=0 use unpretty form.
    pub fn to_json(&self,indent: u16) -> String {
        let mut root = json::JsonValue::new_object();
        root["count"] = json::JsonValue::Number(self.revolutions.len().into());
        root["average_rpm"] = json::JsonValue::Number(self.average_rpm.into());
        root["rpm_variance"] = json::JsonValue::Number(self.rpm_variance.into());
        root["rpm_min"] = json::JsonValue::Number(self.rpm_min.into());
        root["rpm_max"] = json::JsonValue::Number(self.rpm_max.into());
        root["average_duration_us"] = json::JsonValue::Number(self.average_duration_us.into());
        root["index_consistent"] = json::JsonValue::Boolean(self.index_consistent);
        root["timing_stable"] = json::JsonValue::Boolean(self.timing_stable);
        root["overall_quality"] = json::JsonValue::Number(self.overall_quality.into());
        root["best_revolution"] = json::JsonValue::Number(self.best_revolution.into());
        let mut revs = json::JsonValue::new_array();
        for rev in &self.revolutions {
            let mut obj = json::JsonValue::new_object();
            obj["revolution"] = json::JsonValue::Number(rev.revolution.into());
            obj["index_position"] = json::JsonValue::Number(rev.index_position.into());
            obj["sample_count"] = json::JsonValue::Number(rev.sample_count.into());
            obj["duration_us"] = json::JsonValue::Number(rev.duration_us.into());
            obj["rpm"] = json::JsonValue::Number(rev.rpm.into());
            obj["drift_us"] = json::JsonValue::Number(rev.drift_us.into());
            obj["quality"] = json::JsonValue::Number(rev.quality.into());
            obj["index_valid"] = json::JsonValue::Boolean(rev.index_valid);
            revs.push(obj).expect("error while building JSON array");
        }
        root["revolutions"] = revs;
        if indent > 0 {
            json::stringify_pretty(root,indent)
        } else {
            json::stringify(root)
        }
    }
}

/// Infer revolution boundaries by accumulating intervals.  The first
/// boundary is position 0; a boundary is accepted whenever the distance
/// from the last one falls within ten percent of a nominal rotation.
fn find_index_from_flux(flux: &[u32],sample_rate_hz: f64,nominal_rpm: f64,max_indexes: usize) -> Vec<u64> {
    let expected = 60.0 / nominal_rpm * sample_rate_hz;
    let band = expected * 0.1;
    let mut boundaries: Vec<u64> = vec![0];
    let mut current_pos: u64 = 0;
    let mut last_index: u64 = 0;
    for interval in flux {
        if boundaries.len() >= max_indexes {
            break;
        }
        current_pos += *interval as u64;
        let since_index = (current_pos - last_index) as f64;
        if since_index >= expected - band && since_index <= expected + band {
            boundaries.push(current_pos);
            last_index = current_pos;
        }
    }
    boundaries
}

/// sample variance, divide by N-1
fn variance(values: &[f64],mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v-mean)*(v-mean)).sum();
    sum_sq / (values.len() - 1) as f64
}

fn calc_stats(result: &mut RevolutionResult,nominal_rpm: f64) {
    let count = result.revolutions.len();
    if count == 0 {
        return;
    }
    let rpms: Vec<f64> = result.revolutions.iter().map(|r| r.rpm).collect();
    let durations: Vec<f64> = result.revolutions.iter().map(|r| r.duration_us).collect();
    result.rpm_min = rpms.iter().cloned().fold(f64::INFINITY,f64::min);
    result.rpm_max = rpms.iter().cloned().fold(f64::NEG_INFINITY,f64::max);
    result.average_rpm = rpms.iter().sum::<f64>() / count as f64;
    result.average_duration_us = durations.iter().sum::<f64>() / count as f64;
    result.rpm_variance = variance(&rpms,result.average_rpm);
    result.duration_variance = variance(&durations,result.average_duration_us);
    result.index_consistent = result.revolutions.iter().all(|r| r.index_valid);
    let nominal_duration = rpm_to_duration(nominal_rpm);
    result.timing_stable = result.duration_variance.sqrt() < nominal_duration * 0.005;
    let quality_sum: u32 = result.revolutions.iter().map(|r| r.quality as u32).sum();
    result.overall_quality = (quality_sum / count as u32) as u8;
    result.best_revolution = find_best(result);
}

/// Index of the highest quality revolution, first on ties.
pub fn find_best(result: &RevolutionResult) -> u32 {
    let mut best_idx: u32 = 0;
    let mut best_quality: u8 = match result.revolutions.len() {
        0 => return 0,
        _ => result.revolutions[0].quality
    };
    for (i,rev) in result.revolutions.iter().enumerate().skip(1) {
        if rev.quality > best_quality {
            best_quality = rev.quality;
            best_idx = i as u32;
        }
    }
    best_idx
}

/// Solve revolution boundaries from a flux capture.
///
/// `index_data` holds absolute sample positions of index pulses when the
/// capture hardware recorded them.  Fails with `InsufficientData` when fewer
/// than `min_revolutions` can be identified and the fallback is disallowed
/// or has also come up short.
pub fn solve(flux: &[u32],index_data: Option<&[u64]>,options: &RevolutionOptions) -> Result<RevolutionResult,Error> {
    if options.sample_rate_hz <= 0.0 || options.nominal_rpm <= 0.0 || options.tolerance <= 0.0 || options.max_revolutions > MAX_REVOLUTIONS {
        return Err(Error::InvalidArgument);
    }
    if flux.len() == 0 {
        return Err(Error::NoData);
    }
    let mut boundaries: Vec<u64> = match index_data {
        Some(positions) if positions.len() > 0 => {
            positions.iter().take(MAX_REVOLUTIONS+1).cloned().collect()
        },
        _ => match options.use_index_pulse {
            true => find_index_from_flux(flux,options.sample_rate_hz,options.nominal_rpm,MAX_REVOLUTIONS+1),
            false => Vec::new()
        }
    };
    if boundaries.len() < options.min_revolutions + 1 {
        if !options.allow_missing_index {
            debug!("found {} boundaries, need {}",boundaries.len(),options.min_revolutions+1);
            return Err(Error::InsufficientData);
        }
        // estimate boundaries by strict equal partitioning
        warn!("index inference came up short, partitioning equally");
        let expected = (60.0 / options.nominal_rpm * options.sample_rate_hz) as u64;
        let total: u64 = flux.iter().map(|v| *v as u64).sum();
        boundaries = Vec::new();
        let mut pos: u64 = 0;
        while pos <= total && boundaries.len() <= MAX_REVOLUTIONS {
            boundaries.push(pos);
            pos += expected;
        }
    }
    // boundaries must be strictly increasing
    for pair in boundaries.windows(2) {
        if pair[1] <= pair[0] {
            return Err(Error::InvalidArgument);
        }
    }
    let mut result = RevolutionResult::new();
    let nominal_duration = rpm_to_duration(options.nominal_rpm);
    for i in 0..boundaries.len().saturating_sub(1) {
        if result.revolutions.len() >= options.max_revolutions {
            break;
        }
        let start = boundaries[i];
        let end = boundaries[i+1];
        let sample_count = end - start;
        let duration_us = sample_count as f64 / options.sample_rate_hz * 1_000_000.0;
        let rpm = duration_to_rpm(duration_us);
        let quality = match rpm_in_tolerance(rpm,options.nominal_rpm,options.tolerance) {
            true => {
                let deviation = (rpm - options.nominal_rpm).abs() / options.nominal_rpm;
                (100.0 * (1.0 - deviation / options.tolerance)).round().clamp(0.0,100.0) as u8
            },
            false => 0
        };
        result.revolutions.push(RevolutionInfo {
            revolution: result.revolutions.len() as u32,
            index_position: start,
            start_sample: start,
            end_sample: end,
            sample_count,
            duration_us,
            rpm,
            drift_us: duration_us - nominal_duration,
            quality,
            index_valid: true
        });
    }
    calc_stats(&mut result,options.nominal_rpm);
    match result.revolutions.len() >= options.min_revolutions {
        true => Ok(result),
        false => Err(Error::InsufficientData)
    }
}

/// Copy the slice of the flux stream spanning revolution `idx` into `out`.
/// Returns the number of samples written.  When `out` is too small the
/// required length travels in the error and nothing is written.
pub fn extract(flux: &[u32],revs: &RevolutionResult,idx: usize,out: &mut [u32]) -> Result<usize,Error> {
    if idx >= revs.revolutions.len() {
        return Err(Error::OutOfRange);
    }
    let rev = &revs.revolutions[idx];
    let mut current_pos: u64 = 0;
    let mut start_idx: usize = 0;
    let mut end_idx: usize = flux.len();
    let mut found_start = false;
    for (i,interval) in flux.iter().enumerate() {
        if !found_start && current_pos >= rev.start_sample {
            start_idx = i;
            found_start = true;
        }
        current_pos += *interval as u64;
        if found_start && current_pos >= rev.end_sample {
            end_idx = i + 1;
            break;
        }
    }
    if !found_start {
        return Err(Error::NotFound);
    }
    let needed = end_idx - start_idx;
    if needed > out.len() {
        return Err(Error::BufferTooSmall(needed));
    }
    out[0..needed].copy_from_slice(&flux[start_idx..end_idx]);
    Ok(needed)
}
