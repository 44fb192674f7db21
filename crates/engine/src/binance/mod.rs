pub mod rest;

pub use rest::{BinanceClient, Venue};
