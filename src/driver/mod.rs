//! Command line front end.
//!
//! The binary is the shell-facing collaborator: it gathers the facts the
//! engine refuses to look up itself and prints the rendered line.

pub mod cli;
