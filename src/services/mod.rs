//! Connectivity confirmation services
//!
//! Probes, the layered check built from them, the bounded poll loop and the
//! notification collaborator it reports to. None of them know about the
//! environment; they are built from the validated configuration.

pub mod connectivity;
pub mod monitor;
pub mod notification;
pub mod probe;
