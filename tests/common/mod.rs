pub mod builders;
pub mod harness;

// Re-export commonly used test utilities
pub use harness::TestHarness;
