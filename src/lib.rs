//! Bookstore catalog application: module wiring on top of the kernel and
//! HTTP crates.

pub mod modules;
