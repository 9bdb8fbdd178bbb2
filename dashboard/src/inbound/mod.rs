//! Inbound adapters translating user input into controller calls.
//!
//! The command-line shell lives under [`cli`].

pub mod cli;
