//! simple_wbd
//!
//! A small Rust client for the World Bank Data **Climate** and **Indicators**
//! APIs. Pairs with the `wbd` CLI.
//!
//! ### Features
//! - Historical temperature / precipitation for countries and river basins
//! - Indicator datasets for one or more countries, regions or aggregates
//! - Country and indicator catalogues, with "common"/"featured" subsets
//! - Results as `place → period → value` maps or as 2D tables
//! - Save results as CSV or JSON
//!
//! ### Example
//! ```no_run
//! use simple_wbd::Client;
//!
//! let client = Client::default();
//! let italy = client.get_instrumental("Italy")?;
//! assert!(italy.contains_key("Italy"));
//! let both = client.get_instrumental(["Italy", "Slovenia"])?;
//! assert_eq!(both.len(), 2);
//! simple_wbd::storage::save_csv(&both, "tas.csv")?;
//! # Ok::<(), simple_wbd::WbdError>(())
//! ```

pub mod api;
pub mod climate;
pub mod config;
pub mod error;
pub mod indicators;
mod iso;
pub mod models;
pub mod places;
pub mod storage;

pub use api::Client;
pub use climate::{ClimateDataset, DataType, InstrumentalOptions, Interval, Level, ResponseFormat};
pub use config::ClientConfig;
pub use error::{Result, WbdError};
pub use indicators::{CountryField, IndicatorDataset, IndicatorFilter};
pub use models::{Cell, DataPoint, DateSpec, Period, ResultSet, Table};
pub use places::{Location, Places};
