pub mod provider;
pub mod sp500;
pub mod types;
pub mod yahoo;
