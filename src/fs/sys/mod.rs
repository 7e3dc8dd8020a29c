//! Platform primitives behind the scan session: opening a listing, reading one raw
//! record at a time, building entry paths and stat-ing by path.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use windows::*;
