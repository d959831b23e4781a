//! Error type for the object pool (§7: `pool-exhausted`).

/// Errors raised by [`super::Pool::acquire`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool's free list was empty at the time of acquisition. The
    /// caller decides whether to drop, retry, or log (§7 disposition).
    #[error("pool exhausted: all {capacity} slots are in use")]
    Exhausted {
        /// The pool's fixed capacity.
        capacity: usize,
    },
}
