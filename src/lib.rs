//! Circulate - Library Circulation Database Console
//!
//! Circulate is a terminal front-end for a library-management database. A user
//! logs in with one of three database logins, which fixes a permission tier,
//! then runs numbered menu commands. Each command calls a stored procedure or a
//! parameterized query; all business rules live in the database.
//!
//! # Architecture
//! ```text
//! console -> session (login, loop, transactions) -> permission (command table)
//!                     \-> commands -> query builders -> engine (sqlite | postgres | mysql)
//!                                  \-> output (row rendering)
//! ```
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`engine`] - Database engine trait and implementations
//! - [`config`] - Connection profiles
//! - [`permission`] - Tiers and the command table
//! - [`query`] - Search builder, id back-resolution, argument parsing
//! - [`output`] - Row rendering
//! - [`console`] - Line console abstraction
//! - [`session`] - Login and the read-eval loop
//! - [`commands`] - Command handlers

pub mod commands;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod output;
pub mod permission;
pub mod query;
pub mod session;

pub use config::{resolve_connection, ConnectionRegistry, LoginNames, StoredConnection};
pub use console::{Console, LineConsole};
pub use engine::{ConnectionConfig, DatabaseEngine, DatabaseType, Param, QueryResult};
pub use error::{CirculateError, Result};
pub use permission::{Command, Tier};
pub use session::{login, run_session, Session};
