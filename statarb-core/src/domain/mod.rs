//! Domain types shared by the analyzer, signal engine and backtester.

pub mod pair;
pub mod position;
pub mod price_matrix;
pub mod trade;

pub use pair::{pair_label, PairCandidate};
pub use position::{Direction, Entry, PositionState};
pub use price_matrix::{PriceMatrix, PriceMatrixError};
pub use trade::{ExitReason, Trade};
