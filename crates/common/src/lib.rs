pub mod config;
pub mod error;
pub mod market;
pub mod sink;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use market::{MarketDataClient, UniversePolicy};
pub use sink::MessageSink;
pub use types::*;
