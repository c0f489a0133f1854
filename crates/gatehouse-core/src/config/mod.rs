//! Configuration management for Gatehouse.
//!
//! Rate-limit policies and locale settings ([`settings::Settings`]) are
//! stored as a TOML file and loaded at startup.

pub mod settings;
