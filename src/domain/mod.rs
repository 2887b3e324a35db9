//! Domain Layer
//!
//! Registry state, routing policy and the ports they depend on. Nothing
//! here touches a socket directly.

pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;
