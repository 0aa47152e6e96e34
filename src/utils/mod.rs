pub mod span;

pub use span::{LineIndex, Span};
