//! Lifecycle state management.
//!
//! This module provides:
//! - The state machine core owning the canonical stream state
//! - The input debouncer filtering trigger events

pub mod debounce;
pub mod machine;

pub use debounce::{Debouncer, PressDecision};
pub use machine::{StateMachine, TransitionContext};
