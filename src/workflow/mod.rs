pub mod memo_flow;

pub use memo_flow::{DocumentOutcome, MemoFlow, MemoReport};
