//! Error types for the Buildwatch analysis core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Aggregation store already finalized; record() is no longer accepted")]
    StoreClosed,
}
