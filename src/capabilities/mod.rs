//! Provider seams between the core and its hosting platform.
//!
//! Each capability lives in its own module with its provider trait, its data
//! types, and its errors. Shells implement the traits against real platform
//! APIs; tests use the bundled doubles ([`ManualClock`], [`StaticProbe`],
//! [`InMemoryFeed`]) to simulate resize bursts, battery drain, and link
//! degradation deterministically.

mod clock;
mod fetch;
mod platform;

pub use self::clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use self::fetch::{
    async_trait, DataFetcher, EndpointSet, FetchError, HttpDataFetcher, InMemoryFeed,
    ScenarioActivation,
};
pub use self::platform::{HeadlessProbe, PlatformProbe, StaticProbe};
