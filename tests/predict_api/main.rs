//! Predict API integration test suite.
//!
//! Drives the HTTP surface end to end against temporary upload/result
//! directories. The forecast feed runs without a database.
//!
//! Run with: cargo test --test predict_api

mod test_helpers;

mod test_download;
mod test_forecasts;
mod test_template_health;
mod test_upload;
