pub mod api_types;
pub mod client;
pub mod types;

pub use api_types::RawListing;
pub use client::BackendClient;
pub use types::{Listing, Rating};
