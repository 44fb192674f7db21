pub mod binance;
pub mod rate_limit;
pub mod scanner;
pub mod scheduler;

pub use binance::{BinanceClient, Venue};
pub use rate_limit::RateLimiter;
pub use scanner::{ScanSettings, Scanner};
pub use scheduler::ScanScheduler;
