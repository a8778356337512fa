//! CLI subcommands: `run` and `init`.

pub mod init;
pub mod run;
