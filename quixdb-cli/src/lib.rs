//! Command-line front end for QuixDB: thin forwarders from subcommands
//! onto `quixdb::Database`, plus the CLI's own config loading and logging
//! setup.

pub mod command;
pub mod config;
pub mod row;
pub mod trace;
