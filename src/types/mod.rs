pub mod backtest;
pub mod chat;
pub mod tool_result;

pub use backtest::*;
pub use chat::*;
pub use tool_result::*;
