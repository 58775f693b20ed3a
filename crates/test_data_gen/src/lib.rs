//! Test Data Generator for flight-mirror.
//!
//! Generates deterministic reference dimensions (airports, aircraft,
//! passengers, dates) to seed both engines before flights are mirrored.
//!
//! # Example
//!
//! ```rust
//! use test_data_gen::{Generator, RenderConfig, Renderer, Scale};
//!
//! let mut gen = Generator::new(42, Scale::Small);
//! let data = gen.generate();
//!
//! let renderer = Renderer::new(RenderConfig::default());
//! let sql = renderer.render_to_string(&data).unwrap();
//!
//! println!("{}", sql);
//! ```

pub mod fake;
pub mod generator;
pub mod renderer;

pub use generator::{Generator, ReferenceData, Scale, SqlValue, TableData};
pub use renderer::{RenderConfig, Renderer};
