//! Location search and current-weather lookup for Skycast.
//!
//! Provides the weatherapi.com gateway, single-slot persistence of the last
//! selected location, and the coordinator that debounces typed queries,
//! prefetches weather for every candidate and restores the saved location.

pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod store;
pub mod types;

pub use coordinator::{CoordinatorOptions, SearchCoordinator, SearchPhase, SearchState};
pub use debounce::Debouncer;
pub use error::{GatewayError, StoreError};
pub use gateway::{WeatherApiGateway, WeatherGateway};
pub use store::{FileLocationStore, LocationStore, MemoryLocationStore};
pub use types::*;
