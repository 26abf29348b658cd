//! Snowflake identifier generation.
//!
//! Identifiers are 64-bit values built from a millisecond timestamp, a node
//! id and a per-millisecond sequence. Values from one generator are strictly
//! increasing; distinct node ids keep generators on different hosts from
//! colliding without any coordination.

pub mod clock;
pub mod error;
pub mod snowflake;

pub use clock::{Clock, SystemClock};
pub use error::{IdError, Result};
pub use snowflake::{SnowflakeGenerator, SnowflakeParts, decompose};
