pub mod charts;
pub mod dialogs;
pub mod page;

pub use charts::*;
pub use dialogs::*;
pub use page::*;
