pub mod account;
pub mod analytics;
pub mod build;
pub mod build_device;
pub mod guest_upload;
pub mod link_device;
pub mod share_link;

pub use analytics::InstallStatus;
pub use build::{ExpiryType, Platform};
pub use share_link::LinkType;
