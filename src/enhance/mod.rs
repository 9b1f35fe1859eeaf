//! Record enhancement
//!
//! Derived fields computed per record: margins, composite addresses, record
//! age, stock-level buckets, and data-quality flags. Enhancement is pure -
//! the only time input is the explicitly passed as-of timestamp - and never
//! fails: a missing or unusable input yields a null derived field. Source
//! fields are never overwritten.

mod enhancer;

pub use enhancer::{enhance, stock_level, StockLevel};

#[cfg(test)]
mod tests;
