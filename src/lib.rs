//! Repository statistics from GitHub's REST and GraphQL APIs.
//!
//! - `resolve`: target repository and token, from prompts or injected values
//! - `github`: the authenticated request helper shared by every fetcher
//! - `views`, `stats`, `audience`: the fetchers
//! - `render`, `svg`: output formatting
//!
//! The binaries `repo-views` and `repo-stats` wire these together.

pub mod audience;
pub mod config;
pub mod error;
pub mod github;
pub mod render;
pub mod resolve;
pub mod stats;
pub mod svg;
pub mod trace;
pub mod views;

pub use error::{Api, Result, StatsError};
pub use resolve::{AccessToken, RepositoryRef, resolve};
