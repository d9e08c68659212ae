//! Unified error classification for the lumen workspace.
//!
//! Crate-level error enums implement [`ErrorExt`] and map each variant onto a
//! [`StatusCode`], which carries retryability and logging metadata.

mod ext;
mod status_code;

pub use ext::BoxedError;
pub use ext::ErrorExt;
pub use ext::PlainError;
pub use ext::boxed;
pub use snafu::Location;
pub use status_code::StatusCategory;
pub use status_code::StatusCode;
pub use status_code::StatusMeta;
