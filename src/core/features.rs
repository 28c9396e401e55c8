//! Converter features.
//!
//! `unit_converter` holds the unit catalogue, the conversion table and the
//! free-text query parser.

pub mod unit_converter;
