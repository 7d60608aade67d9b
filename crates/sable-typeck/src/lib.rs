//! Type information for the Sable lowering passes.
//!
//! Sable does not type-check programs; the host compiler does that on the
//! generated code. The passes still need types to name container
//! instantiations and to store payload addresses, so this crate provides:
//!
//! - [`TypeInference`]: oracle-first, scope-and-structure second inference
//!   over host expressions, returning [`InferredType`].
//! - [`addr`]: the addressability analyzer and `&expr` synthesis.
//! - [`ty`]: type naming helpers (`Result_int_error`, `ptr_User`).

pub mod addr;
pub mod builtins;
pub mod env;
pub mod error;
pub mod infer;
pub mod ty;

pub use addr::{address_of, is_addressable, wrap_for_address};
pub use error::AddrError;
pub use infer::{InferredType, TypeInference, TypeOracle};
pub use ty::{mangle, sanitize_type_name};
