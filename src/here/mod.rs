pub mod client;
pub mod types;

pub use client::{HereClient, UpstreamError};
pub use types::{GeocodeMatch, RouteSummary};
