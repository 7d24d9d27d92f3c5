//! Seeded organic geometry: branch curves, the trunk, twigs and leaves.

mod curve;
mod decor;
mod trunk;
mod weights;

pub(in crate::app) use curve::{NaturalPath, natural_path};
pub(in crate::app) use decor::{DecorKind, Decoration, decorate_edge};
pub(in crate::app) use trunk::{crown_branches, growth_progress, trunk_outline};
pub(in crate::app) use weights::{branch_thickness, depths, subtree_weights};
