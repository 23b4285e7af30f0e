//! Blur and drop-shadow value nodes, plus the image filter and path effect
//! descriptions handed to the rendering backend.

use crate::color::{Rgba, presets};
use crate::id::EntityId;
use serde::{Deserialize, Serialize};

// ─── Descriptions ────────────────────────────────────────────────────────

/// Image filter applied to a paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageFilter {
    Blur {
        sigma_x: f32,
        sigma_y: f32,
    },
    DropShadow {
        dx: f32,
        dy: f32,
        sigma_x: f32,
        sigma_y: f32,
        color: Rgba,
    },
    /// `inner` is applied first; `outer` runs on its output.
    Compose {
        outer: Box<ImageFilter>,
        inner: Box<ImageFilter>,
    },
}

impl ImageFilter {
    /// Combine the optional blur and shadow of one paint side.
    ///
    /// With both present the shadow runs first and the blur is applied to
    /// the shadow's output.
    pub fn combine(blur: Option<ImageFilter>, shadow: Option<ImageFilter>) -> Option<ImageFilter> {
        match (blur, shadow) {
            (Some(blur), Some(shadow)) => Some(ImageFilter::Compose {
                outer: Box::new(blur),
                inner: Box::new(shadow),
            }),
            (blur, shadow) => blur.or(shadow),
        }
    }
}

/// Path effect applied to the geometry before stroking or filling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathEffect {
    /// Jitter: break the path into segments and displace each one.
    Discrete { segment_length: f32, deviation: f32 },
    /// Alternating on/off run lengths, starting with "on".
    Dash { intervals: Vec<f32>, phase: f32 },
    /// `inner` is applied first; `outer` runs on its output.
    Compose {
        outer: Box<PathEffect>,
        inner: Box<PathEffect>,
    },
}

impl PathEffect {
    /// Combine jitter and dash; a dash is laid over the jittered path.
    pub fn combine(jitter: Option<PathEffect>, dash: Option<PathEffect>) -> Option<PathEffect> {
        match (jitter, dash) {
            (Some(jitter), Some(dash)) => Some(PathEffect::Compose {
                outer: Box::new(dash),
                inner: Box::new(jitter),
            }),
            (jitter, dash) => jitter.or(dash),
        }
    }
}

// ─── Dash patterns ───────────────────────────────────────────────────────

/// The pattern new styles start with: eight units on, eight off.
pub fn default_dash_pattern() -> Vec<bool> {
    let mut pattern = vec![true; 8];
    pattern.extend([false; 8]);
    pattern
}

/// Run-length encode an on/off pattern into dash intervals.
///
/// Intervals alternate on/off starting with "on", so a pattern starting
/// "off" gets a leading on-run of 1. An odd interval count is padded with a
/// trailing 1.
pub fn dash_intervals(pattern: &[bool]) -> Vec<f32> {
    let Some(&first) = pattern.first() else {
        return Vec::new();
    };

    let mut intervals = Vec::new();
    if !first {
        intervals.push(1.0);
    }

    let mut current = first;
    let mut run = 0u32;
    for &unit in pattern {
        if unit == current {
            run += 1;
        } else {
            intervals.push(run as f32);
            current = unit;
            run = 1;
        }
    }
    intervals.push(run as f32);

    if intervals.len() % 2 != 0 {
        intervals.push(1.0);
    }
    intervals
}

/// Expand dash intervals back into an on/off unit pattern.
pub fn expand_dash_intervals(intervals: &[f32]) -> Vec<bool> {
    intervals
        .iter()
        .enumerate()
        .flat_map(|(i, &len)| std::iter::repeat_n(i % 2 == 0, len.max(0.0).round() as usize))
        .collect()
}

// ─── Value nodes ─────────────────────────────────────────────────────────

/// Gaussian blur parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blur {
    horizontal: f32,
    vertical: f32,
}

impl Default for Blur {
    fn default() -> Self {
        Self {
            horizontal: 2.0,
            vertical: 2.0,
        }
    }
}

impl Blur {
    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.horizontal
    }

    pub fn vertical(&self) -> f32 {
        self.vertical
    }

    pub fn set_horizontal(&mut self, amount: f32) {
        self.horizontal = amount.max(0.0);
    }

    pub fn set_vertical(&mut self, amount: f32) {
        self.vertical = amount.max(0.0);
    }

    pub fn filter(&self) -> ImageFilter {
        ImageFilter::Blur {
            sigma_x: self.horizontal,
            sigma_y: self.vertical,
        }
    }
}

/// Drop shadow parameters, optionally tinted by a linked portfolio color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub horizontal_offset: f32,
    pub vertical_offset: f32,
    pub horizontal_blur: f32,
    pub vertical_blur: f32,
    color: Rgba,
    pub(crate) linked_color: Option<EntityId>,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            horizontal_offset: 2.0,
            vertical_offset: 2.0,
            horizontal_blur: 2.0,
            vertical_blur: 2.0,
            color: presets::BLACK.with_alpha(0.5),
            linked_color: None,
        }
    }
}

impl Shadow {
    /// The shadow tint. Tracks the linked color while one is set.
    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    pub fn linked_color(&self) -> Option<EntityId> {
        self.linked_color
    }

    /// Store the link and take over its current value. The portfolio keeps
    /// the subscription in step.
    pub(crate) fn link_color(&mut self, link: Option<(EntityId, Rgba)>) {
        match link {
            Some((id, value)) => {
                self.linked_color = Some(id);
                self.color = value;
            }
            None => self.linked_color = None,
        }
    }

    pub fn filter(&self) -> ImageFilter {
        ImageFilter::DropShadow {
            dx: self.horizontal_offset,
            dy: self.vertical_offset,
            sigma_x: self.horizontal_blur.max(0.0),
            sigma_y: self.vertical_blur.max(0.0),
            color: self.color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intervals_for_default_pattern() {
        assert_eq!(dash_intervals(&default_dash_pattern()), vec![8.0, 8.0]);
    }

    #[test]
    fn leading_off_run_starts_with_a_dot() {
        let pattern = [false, false, true, true];
        assert_eq!(dash_intervals(&pattern), vec![1.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn odd_runs_are_padded() {
        assert_eq!(dash_intervals(&[true, false, true]), vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(dash_intervals(&[true, true, true]), vec![3.0, 1.0]);
        assert!(dash_intervals(&[]).is_empty());
    }

    #[test]
    fn derivation_is_idempotent_under_expansion() {
        let patterns: [&[bool]; 4] = [
            &[true, true, false, true, false, false],
            &[false, true, true, true],
            &[true],
            &[false, false, false, true, false],
        ];
        for pattern in patterns {
            let intervals = dash_intervals(pattern);
            let expanded = expand_dash_intervals(&intervals);
            let total: f32 = intervals.iter().sum();
            assert_eq!(expanded.len(), total as usize);
            assert_eq!(dash_intervals(&expanded), intervals);
        }
    }

    #[test]
    fn shadow_runs_before_blur() {
        let filter = ImageFilter::combine(Some(Blur::default().filter()), Some(Shadow::default().filter()));
        match filter {
            Some(ImageFilter::Compose { outer, inner }) => {
                assert!(matches!(*outer, ImageFilter::Blur { .. }));
                assert!(matches!(*inner, ImageFilter::DropShadow { .. }));
            }
            other => panic!("expected a composed filter, got {other:?}"),
        }
    }

    #[test]
    fn dash_lays_over_jitter() {
        let jitter = PathEffect::Discrete {
            segment_length: 10.0,
            deviation: 2.0,
        };
        let dash = PathEffect::Dash {
            intervals: vec![4.0, 4.0],
            phase: 0.0,
        };
        let combined = PathEffect::combine(Some(jitter.clone()), Some(dash.clone()));
        assert_eq!(
            combined,
            Some(PathEffect::Compose {
                outer: Box::new(dash),
                inner: Box::new(jitter),
            })
        );
    }
}
