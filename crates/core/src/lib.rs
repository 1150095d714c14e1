pub mod item;

pub use item::{ExtractedItem, Unit};
