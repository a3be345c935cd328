//! Feature flag client.
//!
//! Flags are resolved in this order:
//! 1. `FLAGS_*` environment variables (`FLAGS_MY_FLAG=true` answers for
//!    `my_flag`, `my-flag` and `my flag`),
//! 2. the local cache, refreshed from the flags API once its deadline has
//!    passed,
//! 3. `false`.
//!
//! ```no_run
//! use flags_lib::Auth;
//!
//! let client = flags_lib::client()
//!     .auth(Auth::new("project", "agent", "environment"))
//!     .sled("/var/lib/myapp/flags.db")
//!     .build()
//!     .expect("flags cache");
//!
//! if client.is("new-checkout").enabled() {
//!     // ...
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod circuit;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod flag;
pub mod overrides;

pub use builder::ClientBuilder;
pub use cache::{CacheStore, MemoryCache, SledCache};
pub use client::{Client, Flag, RefreshOutcome};
pub use config::{CacheBackend, ClientConfig};
pub use error::FlagsError;
pub use fetcher::{Auth, FlagSource, RemoteFetcher};
pub use flag::{ApiResponse, Details, FeatureFlag};

/// Returns a builder for configuring a flags client.
///
/// Defaults: `https://api.flags.gg`, three attempts per refresh, in-memory
/// cache, ten second circuit cooldown.
pub fn client() -> ClientBuilder {
    builder::create_builder()
}
