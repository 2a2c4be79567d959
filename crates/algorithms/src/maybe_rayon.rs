//! Row-parallel iteration shim
//!
//! Kernels call `into_par_iter()` on a row range. With the `parallel`
//! feature that is rayon's; without it the call resolves to a plain
//! sequential iterator, so the kernels compile unchanged and give the
//! same results.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential `into_par_iter()`
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
