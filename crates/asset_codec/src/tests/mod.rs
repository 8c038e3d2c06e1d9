//! Cross-module scenarios
//!
//! Unit tests live next to the code they cover; these exercise whole runs
//! from files on disk through the registry, generator and weld engine.

mod material_round_trip;
