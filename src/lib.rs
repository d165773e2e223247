pub mod action;
pub mod cli;
pub mod entry;
pub mod error;
pub mod mirrorer;
pub mod plan;
pub mod session;
pub mod transport;
pub mod tree;
pub mod util;

pub use error::{MirrorError, MkdirError, TransportFault};
pub use mirrorer::{Mirrorer, MirrorerConfig};
pub use plan::{Action, ActionCode};
pub use session::DurableSession;
pub use transport::{Credentials, Ssh2Transport, Transport};
