//! Core-guided optimization: soft-literal bookkeeping, bounds, hardening,
//! core trimming and shrinking, and the k-dyn core reformulation.

mod core_guided;
mod kdyn;

pub(crate) use core_guided::CoreGuidedSearch;
pub(crate) use core_guided::OptimisationLevel;
pub(crate) use core_guided::SoftLiteralPool;
