pub mod dispatcher;
pub mod error;
pub mod stream;

pub use dispatcher::{Dispatcher, Handler, Registry};
pub use error::DispatchError;
pub use stream::{Dispatch, Progress, StreamSession, Transcript};
