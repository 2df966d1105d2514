pub mod feed;
pub mod pair;
pub mod position;
pub mod valuation;

pub use feed::*;
pub use pair::*;
pub use position::*;
pub use valuation::*;
