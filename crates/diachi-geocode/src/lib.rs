//! # diachi-geocode
//!
//! External geocoder backends for the diachi address engine.
//!
//! The engine consults a [`Geocoder`](diachi_core::Geocoder) only when the
//! locally assembled candidates are weak, and treats every failure as a
//! soft skip. This crate provides:
//! - [`GoongGeocoder`] — the Goong Maps backend (Vietnam-focused coverage)
//! - [`MockGeocoder`] — canned responses, latency, and failure injection
//!   for tests

pub mod goong;
pub mod mock;

pub use goong::{GoongGeocoder, ENV_GOONG_API_KEY};
pub use mock::MockGeocoder;
