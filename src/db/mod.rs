pub mod store;

pub use store::{InsertOutcome, PriceStore};
