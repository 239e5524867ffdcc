mod history;
mod interval;
mod market;
mod timestamp;

pub use history::{validate_price, PriceHistory, PricePoint, PRICE_PRECISION};
pub use interval::Interval;
pub use market::{Event, Market};
pub use timestamp::UtcDateTime;
