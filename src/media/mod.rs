//! Media handling: the pipeline's external collaborators.
//!
//! The rest of the crate never touches pixels or codecs directly; it calls
//! the [`MediaBackend`] trait, which covers the two operations the pipeline
//! needs per item:
//!
//! - **metadata extraction**: creation timestamp + orientation correction
//! - **preview rendering**: an encoded preview at a target pixel height
//!
//! The module is split into:
//! - **Backend**: [`MediaBackend`] trait, shared types, test mock
//! - **Native**: production implementation ([`NativeBackend`])
//! - **Exif**: minimal hand-rolled EXIF parser used by the native backend

pub mod backend;
pub(crate) mod exif;
pub mod native;

pub use backend::{BackendError, MediaBackend, MediaInfo, Preview};
pub use native::NativeBackend;
