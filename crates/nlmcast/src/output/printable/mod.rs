//! Printable implementations for catalog types.

mod catalog;
