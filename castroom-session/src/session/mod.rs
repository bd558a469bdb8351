mod command;
mod host;
mod identity;
mod interaction;
mod playback;
mod registry;
mod viewer;

pub use command::*;
pub use host::*;
pub use identity::*;
pub use interaction::*;
pub use playback::*;
pub use registry::*;
pub use viewer::*;
