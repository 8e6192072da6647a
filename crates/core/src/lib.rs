//! Core types for Veneer
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Unified value enum for document fields
//! - FieldMap: Top-level field map of a document
//! - DocPath / PathSegment: Explicit path representation into nested values
//! - ObjectId: 24-hex-character random document identifier
//! - Error: Error type hierarchy

#![warn(clippy::all)]

pub mod error;
pub mod oid;
pub mod path;
pub mod value;

pub use error::{Error, Result};
pub use oid::ObjectId;
pub use path::{DocPath, PathParseError, PathSegment, MAX_PATH_DEPTH};
pub use value::{FieldMap, Value};
