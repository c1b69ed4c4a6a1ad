//! # helios
//!
//! Core of a Monte Carlo neutron transport code: a constructive-solid-geometry
//! engine with nested universes and lattices, an ACE cross-section table
//! reader with round-trip dump, and the modular environment that assembles
//! both from parsed input definitions.
//!
//! ## Features
//!
//! - **Geometry**: quadric surfaces, half-space cells, universe/lattice
//!   nesting, point location and distance-to-boundary tracking
//! - **Nuclear data**: block-structured ACE tables (NXS/JXS/XSS), symmetric
//!   parse/dump, ASCII file I/O
//! - **Materials**: nuclide-backed macroscopic cross sections, collision
//!   sampling
//! - **Environment**: factory registry, object staging, dependency-ordered
//!   setup, typed module lookup
//! - **Transport**: source sampling and a reproducible, rayon-parallel
//!   history driver
//!
//! ## Example
//!
//! ```rust,ignore
//! use helios::environment::Environment;
//! use helios::definitions::parse_definitions_file;
//!
//! let mut env = Environment::new();
//! env.push_objects(parse_definitions_file("reactor.json".as_ref())?);
//! env.setup()?;
//! let tallies = helios::transport::run(&env)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

// Core types
pub mod cell;
pub mod particle;
pub mod surface;
pub mod universe;

// Geometry engine
pub mod geometry;
pub mod navigator;

// Nuclear data
pub mod ace;
pub mod material;
pub mod nuclide;

// Environment and input
pub mod definitions;
pub mod environment;
pub mod settings;

// Sampling and transport
pub mod source;
pub mod transport;

// Re-exports for convenience
pub use environment::{Environment, Module, ModuleKind, Registry};
pub use error::{HeliosError, Result};
pub use geometry::Geometry;
pub use navigator::{Navigator, TrackState, TrackingConfig};
