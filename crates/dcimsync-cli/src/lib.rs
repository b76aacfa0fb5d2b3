//! Command line front end for dcimsync: configuration, the NetBox HTTP
//! client, library discovery and the `dcimsync` subcommands.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod loader;
pub mod observability;
pub mod output;
