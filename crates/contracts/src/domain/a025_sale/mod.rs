pub mod aggregate;
pub mod lookup;
pub mod totals;
