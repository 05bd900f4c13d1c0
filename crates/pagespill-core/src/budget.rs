//! Abstract memory budget interfaces.
//!
//! The concrete budget lives in `pagespill-mem`. Only traits live here so the
//! codec and file crates can name them without depending on the accounting.

/// Bytes held against a [`MemoryBudget`].
///
/// Implementations are RAII: dropping the guard hands the bytes back.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;

    /// Debug tag naming the owner of the reservation.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A hard cap on reserved bytes shared by many spillers.
///
/// `try_acquire` never blocks. A `None` means the caller is over budget and
/// must fail or shrink its request.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Approximate currently used bytes (advisory; not a correctness API).
    fn used_bytes(&self) -> usize;
}
