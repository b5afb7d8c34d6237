//! # tplsync-sync
//!
//! Fetch a template folder from a remote repository and install it locally.
//!
//! Call [`synchronize`] with a [`RemoteSource`](tplsync_core::RemoteSource),
//! a [`Destination`](tplsync_core::Destination) and [`SyncOptions`] naming the
//! [`Fetcher`] to use ([`GitFetcher`] in production).

pub mod error;
pub mod fetch;
pub mod materialize;
pub mod synchronizer;
pub mod workspace;

pub use error::{FetchFailure, SyncError, SyncErrorKind};
pub use fetch::{Fetcher, GitFetcher};
pub use materialize::CopyResult;
pub use synchronizer::{synchronize, Cleanup, SyncOptions, SyncReport};
pub use workspace::Workspace;
