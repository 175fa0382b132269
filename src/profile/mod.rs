//! Profile Store
//!
//! Named tunnel configurations (protocol type plus an opaque config
//! payload). Profiles are referenced by connections through their id only;
//! deleting a profile does not touch connections that were bound to it.

pub mod store;
pub mod types;

pub use store::ProfileStore;
pub use types::{CreateProfileRequest, Profile, TunnelType, UpdateProfileRequest};
