pub mod backtest;
pub mod chat;

pub use backtest::*;
pub use chat::*;
