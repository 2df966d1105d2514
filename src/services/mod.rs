pub mod portfolio;
pub mod price_board;
pub mod subscriptions;
pub mod valuation;

pub use portfolio::aggregate;
pub use price_board::PriceBoard;
pub use subscriptions::{required_feeds, SubscriptionDelta, SubscriptionSet};
pub use valuation::{EngineConfig, ValuationEngine, ValuationError};
