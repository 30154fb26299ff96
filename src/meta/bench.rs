//! Timing smoke tests for struct registration
