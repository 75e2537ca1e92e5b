//! # Catalog Module
//!
//! Browsing and track resolution against the remote music catalog.
//!
//! ## Overview
//!
//! - [`CatalogService`]: the remote API contract, implemented over the host
//!   HTTP client by [`HttpCatalogService`]
//! - [`CatalogLoader`]: turns a [`SongRequest`] into a list of tracks with
//!   resolved stream URLs, and loads chart previews
//! - [`HomeFeedLoader`]: loads every home page section concurrently
//!
//! Tracks are identified by [`TrackId`]. Stream resolution is merged into a
//! listing by id; tracks the server has no stream for stay in the list with
//! `url = None`.

pub mod dto;
pub mod error;
pub mod home;
pub mod http;
pub mod loader;
pub mod mapper;
pub mod models;
pub mod service;

pub use error::{CatalogError, Result};
pub use home::{HomeFeed, HomeFeedLoader, RecommendedSongs};
pub use http::HttpCatalogService;
pub use loader::{CatalogLoader, ChartFailure, ChartLoadReport, ResolvedTracks};
pub use models::{
    AlbumSummary, Banner, Chart, ChartSummary, DiscoveryIcon, PlaylistSummary, RecommendedEntry,
    StreamInfo, Track, TrackId, TrackSummary,
};
pub use service::{CatalogService, SongRequest};
