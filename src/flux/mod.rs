//! # Flux Module
//!
//! This aligns raw flux captures into disk revolutions and merges multiple
//! decoded revolutions into one bit stream.
//!
//! A flux capture is an ordered sequence of unsigned intervals, each the
//! count of sample-clock ticks between consecutive flux transitions.
//! The `solver` submodule segments such a stream into revolutions, using
//! supplied index pulse positions when available and inferring boundaries
//! otherwise.  The `merge` submodule votes corresponding bits of several
//! decoded revolutions against each other, producing a merged stream, a
//! confidence array, and a weak bit mask.
//!
//! The solver owns no state between calls; each invocation consumes its
//! inputs and produces a fresh result value.  Input buffers are never
//! mutated.

pub mod solver;
pub mod merge;

/// Enumerates flux processing errors.  The `Display` trait will print the
/// equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no flux data")]
    NoData,
    #[error("no index pulses found")]
    NoIndex,
    #[error("not enough revolutions in capture")]
    InsufficientData,
    #[error("revolution index out of range")]
    OutOfRange,
    #[error("output buffer too small, need {0} samples")]
    BufferTooSmall(usize),
    #[error("revolution start not found in flux stream")]
    NotFound
}
