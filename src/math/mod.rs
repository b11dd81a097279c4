//! Numeric foundations: fixed-point arithmetic and the pool invariant
//! math built on top of it.
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`fixed_point`] | 10^18-scaled [`FixedPoint`] with directional rounding |
//! | [`log_exp`] | ln/exp kernel behind `pow_down` / `pow_up` |
//! | [`weighted`] | Closed-form weighted-pool invariant, swap and share math |
//! | [`stable`] | Iterative stable-curve invariant and balance solvers |

pub mod fixed_point;
mod log_exp;
pub mod stable;
pub mod weighted;

pub use fixed_point::FixedPoint;
