mod broker;
mod event;
mod loopback;

pub use broker::*;
pub use event::*;
pub use loopback::*;
