//! Value objects shared across the domain.

mod symbol;

pub use symbol::Symbol;
