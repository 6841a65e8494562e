//! Odontogram layout: a 2D pose for every tooth on the chart canvas.
//!
//! Coordinates are percentages of the canvas (0-100, y grows downwards).
//! The default layout places each arch on a parabola; users may drag teeth
//! around and only their overrides are stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tooth::{Arch, Dentition, ToothId, ToothKind};

pub const MIN_SCALE: f64 = 0.4;
pub const MAX_SCALE: f64 = 2.5;

const ARCH_MARGIN: f64 = 8.0;
const UPPER_APEX: f64 = 12.0;
const LOWER_APEX: f64 = 88.0;
const ARCH_DEPTH: f64 = 28.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
}

/// Maps any angle in degrees into `(-180, 180]`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    let r = degrees % 360.0;
    if r <= -180.0 {
        r + 360.0
    } else if r > 180.0 {
        r - 360.0
    } else {
        r
    }
}

impl Pose {
    /// Builds a pose with every component forced into range.
    pub fn new(x: f64, y: f64, rotation: f64, scale: f64) -> Self {
        Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
            rotation: normalize_rotation(rotation),
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    pub fn clamped(self) -> Self {
        Self::new(self.x, self.y, self.rotation, self.scale)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// Moves a pose by percentage deltas, stopping at the canvas edges.
pub fn apply_drag(pose: Pose, dx: f64, dy: f64) -> Pose {
    Pose::new(pose.x + dx, pose.y + dy, pose.rotation, pose.scale)
}

fn kind_scale(kind: ToothKind) -> f64 {
    match kind {
        ToothKind::Incisor => 0.85,
        ToothKind::Canine => 0.95,
        ToothKind::Premolar => 1.0,
        ToothKind::Molar => 1.25,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub dentition: Dentition,
    pub poses: BTreeMap<ToothId, Pose>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedTooth {
    pub tooth: ToothId,
    pub kind: ToothKind,
    pub arch: Arch,
    pub pose: Pose,
}

impl Layout {
    /// Replaces default poses with stored ones. Teeth outside this
    /// dentition are ignored and stored poses are re-clamped.
    pub fn merge_overrides(mut self, overrides: &BTreeMap<ToothId, Pose>) -> Self {
        for (tooth, pose) in overrides {
            if let Some(slot) = self.poses.get_mut(tooth) {
                *slot = pose.clamped();
            }
        }
        self
    }

    pub fn pose(&self, tooth: ToothId) -> Option<Pose> {
        self.poses.get(&tooth).copied()
    }

    /// Teeth in chart order: upper arch right to left, then lower arch.
    pub fn placed_teeth(&self) -> Vec<PlacedTooth> {
        self.dentition
            .teeth()
            .into_iter()
            .filter_map(|tooth| {
                self.poses.get(&tooth).map(|pose| PlacedTooth {
                    tooth,
                    kind: tooth.kind(),
                    arch: tooth.arch(),
                    pose: *pose,
                })
            })
            .collect()
    }
}

fn place_arch(dentition: Dentition, arch: Arch, poses: &mut BTreeMap<ToothId, Pose>) {
    let teeth = dentition.arch_order(arch);
    let last = (teeth.len() - 1) as f64;
    let half_width = 50.0 - ARCH_MARGIN;
    let (apex, depth, turn) = match arch {
        Arch::Upper => (UPPER_APEX, ARCH_DEPTH, 0.0),
        Arch::Lower => (LOWER_APEX, -ARCH_DEPTH, 180.0),
    };

    for (i, tooth) in teeth.into_iter().enumerate() {
        let u = -1.0 + 2.0 * i as f64 / last;
        let x = 50.0 + u * half_width;
        let y = apex + depth * u * u;
        let tangent = (2.0 * depth * u).atan2(half_width).to_degrees();

        poses.insert(tooth, Pose::new(x, y, tangent + turn, kind_scale(tooth.kind())));
    }
}

/// Both arches on parabolic curves, mirror-symmetric about x = 50.
pub fn default_layout(dentition: Dentition) -> Layout {
    let mut poses = BTreeMap::new();
    place_arch(dentition, Arch::Upper, &mut poses);
    place_arch(dentition, Arch::Lower, &mut poses);
    Layout { dentition, poses }
}
