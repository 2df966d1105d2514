//! Perpwatch - real-time PnL and liquidation watcher for leveraged perp positions
//!
//! Synchronizes oracle price streams over WebSocket, values open leveraged
//! positions against the latest prices, and folds the results into
//! portfolio totals. Order placement, signing and rendering live elsewhere;
//! this crate only derives values from data already in memory.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;
