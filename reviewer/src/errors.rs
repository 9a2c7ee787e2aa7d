//! Crate-wide error type for the orchestrator's fail-fast stages.
//!
//! Everything past stage 2 is soft-fail by design (spec §7): this type only
//! ever surfaces as text inside a `failed`-status `ReviewOutput`, never as a
//! `Result` the caller has to unwrap.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Checkout(#[from] checkout::CheckoutError),

    #[error("configuration error: {0}")]
    Config(String),
}
