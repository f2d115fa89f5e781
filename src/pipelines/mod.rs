//! Render pipelines and the uniforms they bind.
//!
//! - `basic` builds the Phong mesh pipeline, one variant per face culling
//!   and colour write combination
//! - `light` packs the scene's lights into the lights uniform

pub mod basic;
pub mod light;
