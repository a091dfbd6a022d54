//! The sound map grid and its cells.

pub mod cell;
pub mod map;

pub use cell::{GridCell, SourceAccumulator};
pub use map::{CellIndex, SampleSink, SoundGrid};
