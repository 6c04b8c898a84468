pub mod dispatcher;
pub mod events;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use events::{ClientCommand, ServerEvent};
pub use registry::{ConnectionRegistry, SessionHandle};
