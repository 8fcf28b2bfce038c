//! # CLI Module
//!
//! Command-line front end for the `routemux` binary: a small demo application
//! that exercises every handler style, served over `may_minihttp`.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! routemux serve --addr 0.0.0.0:8080 --config routemux.yaml
//! ```
//!
//! Options:
//! - `--addr <ADDR>` - Listen address (default `0.0.0.0:8080`)
//! - `--config <FILE>` - Router configuration YAML (also `ROUTEMUX_CONFIG`)
//! - `--workers <N>` - `may` worker threads
//! - `--pretty` - Human-readable logs instead of JSON
//!
//! ### `routes`
//!
//! Print the demo routing table.
//!
//! ### `url`
//!
//! Build a URL for a named route:
//!
//! ```bash
//! routemux url user id 42
//! ```

mod commands;
mod demo;


pub use commands::{run_cli, Cli, Commands};
pub use demo::{demo_router, MemorySessions};
