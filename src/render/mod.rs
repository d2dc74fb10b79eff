pub mod backtest;
pub mod charts;
pub mod chat;
pub mod format;
