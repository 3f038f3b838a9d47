//! ## Bit merger
//!
//! Votes corresponding bits of several decoded revolutions against each
//! other.  A majority fixes each output bit; ties go to zero and are marked
//! weak, as is any split where the winning side holds less than three
//! quarters of the reads.  Missing revolutions may be passed as `None` and
//! are skipped in the count of votes for either side, though the confidence
//! denominator stays the full revolution count.
//!
//! Bit order is MSB first: bit `p` lives in byte `p/8` at bit `7 - p%8`.

use bit_vec::BitVec;
use super::Error;

/// agreement below this fraction marks a bit weak even when one side wins
const WEAK_AGREEMENT: f64 = 0.75;

/// Output of a merge.  The confidence array is a per-byte summary: each
/// byte holds the confidence of the last bit voted into it.  Callers that
/// need finer grain should consult the weak bit mask instead.
pub struct MergedRevolution {
    pub data: Vec<u8>,
    pub bit_count: usize,
    pub confidence: Vec<u8>,
    pub weak_bits: Vec<u8>,
    pub weak_count: usize
}

fn get_bit(dat: &[u8],pos: usize) -> bool {
    (dat[pos/8] >> (7 - pos%8)) & 1 > 0
}

fn check_inputs(revs: &[Option<&[u8]>],bit_count: usize) -> Result<(),Error> {
    if revs.len() < 2 || bit_count == 0 {
        return Err(Error::InvalidArgument);
    }
    let byte_count = (bit_count + 7) / 8;
    for rev in revs {
        if let Some(dat) = rev {
            if dat.len() < byte_count {
                return Err(Error::InvalidArgument);
            }
        }
    }
    Ok(())
}

/// Merge revolutions bit by bit with majority voting.
pub fn merge(revs: &[Option<&[u8]>],bit_count: usize) -> Result<MergedRevolution,Error> {
    check_inputs(revs,bit_count)?;
    let byte_count = (bit_count + 7) / 8;
    let mut data = BitVec::from_elem(bit_count,false);
    let mut weak = BitVec::from_elem(bit_count,false);
    let mut confidence = vec![0;byte_count];
    let mut weak_count = 0;
    for pos in 0..bit_count {
        let mut ones = 0;
        let mut zeros = 0;
        for rev in revs {
            if let Some(dat) = rev {
                match get_bit(dat,pos) {
                    true => ones += 1,
                    false => zeros += 1
                }
            }
        }
        let (bit,conf,mut is_weak) = if ones > zeros {
            (true,(100 * ones / revs.len()) as u8,false)
        } else if zeros > ones {
            (false,(100 * zeros / revs.len()) as u8,false)
        } else {
            // tie goes to zero
            (false,50,true)
        };
        if ones > 0 && zeros > 0 {
            let agreement = usize::max(ones,zeros) as f64 / revs.len() as f64;
            if agreement < WEAK_AGREEMENT {
                is_weak = true;
            }
        }
        data.set(pos,bit);
        confidence[pos/8] = conf;
        if is_weak {
            weak.set(pos,true);
            weak_count += 1;
        }
    }
    Ok(MergedRevolution {
        data: data.to_bytes(),
        bit_count,
        confidence,
        weak_bits: weak.to_bytes(),
        weak_count
    })
}

/// Cross-check pass: a bit is weak iff the non-missing revolutions disagree
/// on it.  Running it twice on the same inputs gives the same mask.
pub fn detect_weak(revs: &[Option<&[u8]>],bit_count: usize) -> Result<(Vec<u8>,usize),Error> {
    check_inputs(revs,bit_count)?;
    let mut weak = BitVec::from_elem(bit_count,false);
    let mut weak_count = 0;
    for pos in 0..bit_count {
        let mut reference: Option<bool> = None;
        for rev in revs {
            if let Some(dat) = rev {
                let bit = get_bit(dat,pos);
                match reference {
                    None => reference = Some(bit),
                    Some(r) if r != bit => {
                        weak.set(pos,true);
                        weak_count += 1;
                        break;
                    },
                    _ => {}
                }
            }
        }
    }
    Ok((weak.to_bytes(),weak_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanimous_bits_are_strong() {
        let a = [0xa5_u8];
        let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&a),Some(&a)];
        let merged = merge(&revs,8).expect("merge failed");
        assert_eq!(merged.data,vec![0xa5]);
        assert_eq!(merged.weak_bits,vec![0x00]);
        assert_eq!(merged.weak_count,0);
        assert_eq!(merged.confidence,vec![100]);
    }

    #[test]
    fn missing_revolutions_are_skipped() {
        let a = [0xff_u8];
        let b = [0xff_u8];
        let revs: Vec<Option<&[u8]>> = vec![Some(&a),None,Some(&b)];
        let merged = merge(&revs,8).expect("merge failed");
        assert_eq!(merged.data,vec![0xff]);
        assert_eq!(merged.weak_count,0);
        // denominator stays the full revolution count
        assert_eq!(merged.confidence,vec![66]);
    }

    #[test]
    fn partial_bytes() {
        let a = [0xf0_u8];
        let revs: Vec<Option<&[u8]>> = vec![Some(&a),Some(&a)];
        let merged = merge(&revs,4).expect("merge failed");
        assert_eq!(merged.data,vec![0xf0]);
        assert_eq!(merged.bit_count,4);
    }
}
