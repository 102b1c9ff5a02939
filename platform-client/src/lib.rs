pub mod client;
pub mod error;
pub mod types;

pub use client::PlatformClient;
pub use error::{PlatformError, PlatformErrorKind};
pub use types::{flatten_tree, CategoryNode, FlatCategory, PickupPointCandidate, RegionSeller};
