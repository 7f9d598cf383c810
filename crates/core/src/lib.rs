pub mod receipt;
pub mod yen;

pub use receipt::{Item, ItemError, ParseResult};
pub use yen::Yen;
