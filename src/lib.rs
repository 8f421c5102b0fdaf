//! # Botflow
//!
//! An interpreter for automation scripts: tree-structured lists of commands
//! with loops, branches, try/catch and sub-scripts, run against a variable
//! store with `{placeholder}` resolution.
//!
//! ## Usage
//!
//! ```bash
//! botflow run script.json [--var vName=value] [--continue-on-error] [-v]
//! botflow validate script.yaml
//! botflow commands
//! ```
//!
//! ## Modules
//!
//! - `error` - Error types with numeric codes and exit-code mapping
//! - `config` - Engine settings from `settings.toml` and `BOTFLOW_*` variables
//! - `variables` - Variable values (text, lists, dictionaries, tables) and the store
//! - `resolver` - Placeholder resolution, JSON paths, system variables and arithmetic
//! - `script` - Script documents, loading and compilation into nodes
//! - `commands` - The command contract, registry and built-in commands
//! - `engine` - Execution engine with pause/step/cancel control and events
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod script;
pub mod variables;
