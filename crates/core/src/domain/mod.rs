pub mod contract;
pub mod snapshot;

pub use snapshot::{FundamentalSnapshot, MembershipRow, PricePoint};
