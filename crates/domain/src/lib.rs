//! # tripwire-domain
//!
//! Pure rule model for the tripwire automation core.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions
//! - Define **Events** (device attribute changes and timer ticks)
//! - Define **Change filters** and **Change groups** (predicates over one event)
//! - Define **Attribute filters** and **Trigger definitions** (the rule tree)
//! - Provide the staged **builder DSL** that produces trigger definitions
//! - Define the **Device** snapshot reported by a hub
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or an async runtime.
//! Dispatch, scheduling and IO boundaries live in the `app` crate.

pub mod error;
pub mod id;

pub mod device;
pub mod event;
pub mod trigger;
