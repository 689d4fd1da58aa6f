pub mod event;
pub mod handler;

pub use event::{FunctionUrlEvent, FunctionUrlResponse};
pub use handler::{handle_request, FunctionResponse};
