//! Weather acquisition for WunderBubble
//!
//! Position queries, the combined provider request, and normalization of the
//! reply into the compact status shape shared between participants.

pub mod lenient;
pub mod links;
pub mod location;
pub mod normalize;
pub mod provider;
pub mod response;
pub mod types;

pub use links::{IconSource, ProviderLinks};
pub use location::{FixedLocation, GeolocationProvider, NoLocationService, PositionOptions};
pub use normalize::normalize;
pub use provider::{WeatherClient, WeatherProvider};
pub use response::WeatherResponse;
pub use types::*;
