pub mod broadcaster;
pub mod live_updates;

pub use broadcaster::*;
pub use live_updates::*;
