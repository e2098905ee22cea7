//! PDF Converter Server Library
//!
//! Renders uploaded PDF documents to base64 page images while keeping the
//! process memory bounded: one document session and one raster resident per
//! conversion, with output quality picked per page from its estimated size.
//!
//! # Modules
//!
//! - `render`: Conversion pipeline (policy, session, renderer, driver)
//! - `routes`: HTTP handlers
//! - `config`: Environment configuration

pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod state;
