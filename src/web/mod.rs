pub mod server;
pub mod state;
pub mod templates;

pub use server::*;
pub use state::*;
pub use templates::*;
