//! Goggles - assumption-gated statistical comparison of experimental conditions
//!
//! This library checks the one-way ANOVA assumptions (equal cell sizes,
//! normality, homoscedasticity) for a measured variable split into k
//! conditions, then routes to the test family those assumptions allow:
//! ANOVA with Tukey HSD, Welch's ANOVA with Games-Howell, or Kruskal-Wallis
//! with Dunn's test. Effect size and power are reported alongside, and every
//! statistical step is emitted to an injected log.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod journal;
pub mod plot;
pub mod preprocess;
pub mod samples;
pub mod stats;

pub use error::{AnalysisError, Result};
