//! tickwatch: live stock price dashboard core
//!
//! This library provides:
//! - Symbol discovery from an HTTP catalog
//! - One WebSocket price stream per symbol
//! - Bounded per-symbol tick history and sequential percent change
//! - A single-task aggregator with an explicit selection cursor
//! - A presenter that formats aggregator output for list, header and chart views
//! - Structured logging and Prometheus metrics
//!
//! The UI shell wires it together roughly like this:
//!
//! ```no_run
//! use std::sync::Arc;
//! use tickwatch::aggregator::{bootstrap, Aggregator};
//! use tickwatch::catalog::HttpCatalog;
//! use tickwatch::config::Config;
//! use tickwatch::feed::WsStreamConnector;
//!
//! # async fn wire() -> anyhow::Result<()> {
//! let config = Config::load("config.toml")?;
//! let _telemetry = tickwatch::telemetry::init_telemetry(&config.telemetry)?;
//!
//! let connector = Arc::new(WsStreamConnector::from_config(&config.stream));
//! let (aggregator, _updates) = Aggregator::spawn(&config, connector);
//! let catalog = HttpCatalog::new(&config.catalog)?;
//! bootstrap(&catalog, &aggregator.handle()).await?;
//! // Feed `_updates` into a `view::Presenter`
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod feed;
pub mod history;
pub mod telemetry;
pub mod tracker;
pub mod view;
pub mod ws;
