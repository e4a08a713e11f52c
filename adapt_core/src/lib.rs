#![forbid(unsafe_code)]

//! Core domain model and decision logic for real-time adaptive training.
//!
//! This crate provides:
//! - Domain types (observations, snapshots, decisions, issues)
//! - Scoring: trend, plateau, fatigue/recovery, intensity, rest
//! - Exercise substitution backed by an equipment-aware catalog
//! - Session learning and the real-time coaching feed
//! - The `AdaptiveEngine` that wires them to injected collaborators
//! - Persistence of completed sets (JSONL journal, CSV archive)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod buffer;
pub mod trend;
pub mod fatigue;
pub mod plateau;
pub mod intensity;
pub mod rest;
pub mod catalog;
pub mod substitution;
pub mod session;
pub mod coaching;
pub mod provider;
pub mod engine;
pub mod journal;
pub mod csv_rollup;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use buffer::SnapshotBuffer;
pub use catalog::{build_default_catalog, get_default_catalog, StaticCatalog};
pub use coaching::{CancelToken, CoachingFeed, CoachingMessage};
pub use engine::{AdaptiveEngine, Observed};
pub use history::FileRepository;
pub use journal::{JsonlSink, RecordSink};
pub use plateau::PlateauReport;
pub use provider::{ExerciseCatalog, FormReading, MovementProvider, PerformanceRepository, ReplayProvider};
pub use session::SessionLearning;
pub use substitution::ExerciseSubstitution;
