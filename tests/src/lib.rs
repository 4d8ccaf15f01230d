//! # NebulaSwap Test Suite
//!
//! Cross-module tests that drive real coordinators against the simulated
//! ledgers and relayer.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs     # Simulated world + coordinator helpers
//!     ├── flows.rs       # Happy paths, both directions, concurrency
//!     ├── safety.rs      # Counterparty misbehaviour, timeouts, refunds
//!     └── resilience.rs  # Signing rejections, disconnects, lost acks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p nebula-tests
//! cargo test -p nebula-tests integration::safety::
//! ```

pub mod integration;
