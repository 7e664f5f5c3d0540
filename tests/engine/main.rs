//! Integration tests for Layer 1: Engine
//!
//! Tests for pattern matching, the knowledge engine lifecycle, conflict
//! resolution, and agenda consistency.

mod lifecycle;
mod matching;
