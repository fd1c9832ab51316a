//! Locates the elevation bands where stream points of carbonate, felsic and
//! mafic bedrock all occur, per study site, and extracts those points.

pub mod config;
pub mod data;
pub mod error;
pub mod extract;
pub mod hypsometry;
pub mod pipeline;
