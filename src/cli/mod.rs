//! # CLI Module
//!
//! Command-line front end of the `routedoc` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Run a small demo application with its documentation page mounted:
//!
//! ```bash
//! routedoc serve --addr 127.0.0.1:8080 --openapi doc/openapi.yaml --watch
//! ```
//!
//! Options:
//! - `--config <FILE>` - YAML, TOML or JSON configuration file
//! - `--openapi <FILE>` - OpenAPI document to import (overrides the config)
//! - `--addr <ADDR>` - Listen address (default `127.0.0.1:8080`)
//! - `--watch` - Rebuild documentation when sources change
//! - `--stack-size <BYTES>` - Coroutine stack size (`ROUTEDOC_STACK_SIZE`)
//!
//! ### `inspect`
//!
//! Print what the importer reads from a document, as JSON:
//!
//! ```bash
//! routedoc inspect --openapi doc/openapi.yaml
//! ```

mod commands;


pub use commands::{demo_app, register_demo_docs, run_cli, Cli, Commands, DEFAULT_STACK_SIZE};
