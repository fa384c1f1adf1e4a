use core::cell::OnceCell;

use crate::linalg::LinalgError;

/// Observable state of a [`FactorCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing computed yet.
    Uninitialized,
    /// Factors computed and held.
    Factorized,
    /// Factorization aborted; every accessor reports the stored error.
    Failed,
}

/// Lazily computed factorization result.
///
/// The first access runs the factorization exactly once and stores either the
/// factors or the error that aborted it. Later accesses read the stored
/// result. Only [`FactorCache::invalidate`] returns the cache to
/// [`CacheState::Uninitialized`].
///
/// ```
/// use densolve::linalg::{CacheState, FactorCache};
///
/// let mut cache = FactorCache::new();
/// assert_eq!(cache.state(), CacheState::Uninitialized);
/// assert_eq!(*cache.get_or_factor(|| Ok(42)).unwrap(), 42);
/// // cached: the closure is not run again
/// assert_eq!(*cache.get_or_factor(|| Ok(0)).unwrap(), 42);
/// cache.invalidate();
/// assert_eq!(cache.state(), CacheState::Uninitialized);
/// ```
#[derive(Debug, Clone)]
pub struct FactorCache<F> {
    cell: OnceCell<Result<F, LinalgError>>,
}

impl<F> Default for FactorCache<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FactorCache<F> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Cached factors, computing them with `factor` on first access.
    pub fn get_or_factor(
        &self,
        factor: impl FnOnce() -> Result<F, LinalgError>,
    ) -> Result<&F, LinalgError> {
        self.cell.get_or_init(factor).as_ref().map_err(|e| *e)
    }

    pub fn state(&self) -> CacheState {
        match self.cell.get() {
            None => CacheState::Uninitialized,
            Some(Ok(_)) => CacheState::Factorized,
            Some(Err(_)) => CacheState::Failed,
        }
    }

    /// Discard the cached result.
    pub fn invalidate(&mut self) {
        self.cell.take();
    }

    /// Discard the cached result and record `err` as the outcome.
    pub(crate) fn fail(&mut self, err: LinalgError) {
        self.cell = OnceCell::from(Err(err));
    }
}
