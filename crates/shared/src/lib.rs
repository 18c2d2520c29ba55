//! Types shared between the detection client library and its front-ends.

pub mod domain;
pub mod error;
pub mod protocol;
