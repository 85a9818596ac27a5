//! This module holds typed parameters for various endpoint inputs.
//!
//! By using typed parameters, inputs are validated (by type) and correctly
//! formatted before they reach the SSE manager.

pub(crate) mod notification;
pub(crate) mod subscription;
