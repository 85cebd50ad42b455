//! Proxy core.
//!
//! # Data Flow
//! ```text
//! accepted client stream
//!     → handler.rs (single 4096-byte read, decode)
//!     → resolver.rs (CONNECT → tunnel, otherwise forward via Host:)
//!     → dialer.rs (one TCP connect attempt)
//!     → handler.rs (200 reply for tunnels, request replay for forwards)
//!     → relay.rs ×2 (client→upstream, upstream→client, run together)
//!     → dedup.rs (payload digests for debug logging)
//! ```
//!
//! # Design Decisions
//! - One upstream per client connection, used for one exchange
//! - The two relay directions finish independently; neither cancels the other
//! - The dedup cache is injected, not global

pub mod dedup;
pub mod dialer;
pub mod handler;
pub mod relay;
pub mod resolver;

pub use dedup::DedupCache;
pub use dialer::{Dialer, TcpDialer};
pub use handler::ConnectionHandler;
pub use relay::{Direction, Relay};
pub use resolver::{Destination, Mode};
