//! Built-in middleware.
//!
//! Each constructor returns a [`Middleware`](gale_core::Middleware) ready to
//! be passed to `Server::use_middleware`. Order matters: the first element of
//! the list is the outermost wrapper.

mod recover;
mod request_id;
mod timeout;
mod trace;

pub use recover::recover;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id};
pub use timeout::timeout;
pub use trace::trace;
