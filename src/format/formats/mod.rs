//! Stitch-file format implementations.

mod dst;
mod exp;
mod jef;
mod pec;
mod pes;

#[cfg(test)]
mod tests;

pub use dst::DstFormat;
pub use exp::ExpFormat;
pub use jef::{Hoop, JefFormat};
pub use pec::PecFormat;
pub use pes::PesFormat;
