//! Data layer: core types, loading, filtering and density.
//!
//! Architecture:
//! ```text
//!  remote GeoJSON / .geojson / police.uk .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse → FeatureCollection
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────────┐
//!   │ FeatureCollection │  Vec<Feature>, shared read-only
//!   └───────────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  month + crime type → visible indices, CrimeCounts
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ heatmap   │  visible points → DensityGrid
//!   └──────────┘
//! ```

pub mod filter;
pub mod heatmap;
pub mod loader;
pub mod model;
