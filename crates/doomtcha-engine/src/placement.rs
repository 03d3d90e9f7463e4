//! Randomized collision-avoiding placement for dodging UI elements.
//!
//! Rejection sampling: draw candidate positions inside the margined
//! container until one clears every exclusion rectangle, or the attempt
//! budget runs out. Placement must always produce *some* position, so the
//! budget-exhausted case returns the last draw flagged as degraded rather
//! than failing.

use rand::Rng;

/// Margin kept between a placed element and the container edge, in
/// section-local units.
pub const EDGE_MARGIN: f64 = 20.0;

/// Attempt budget for the captcha-page dodge (one exclusion: the title).
pub const CAPTCHA_DODGE_ATTEMPTS: u32 = 20;

/// Attempt budget for the runaway "No" wrapper on the confirmation page
/// (two exclusions: the Yes button and the question text).
pub const RUNAWAY_DODGE_ATTEMPTS: u32 = 50;

/// Width/height pair in section-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

/// Axis-aligned rectangle in section-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Axis-aligned overlap test: two rectangles do not overlap iff one is
    /// entirely to the left, right, above, or below the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.x + self.w < other.x
            || self.x > other.x + other.w
            || self.y + self.h < other.y
            || self.y > other.y + other.h)
    }
}

/// Position chosen for the element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// True when no overlap-free spot was found within the attempt budget
    /// and the last drawn candidate was used instead.
    pub degraded: bool,
}

/// Draw random positions for an `element`-sized rectangle inside `bounds`
/// until one clears all `exclusions`, or `max_attempts` draws have been
/// made. Pure function of its inputs plus `rng`.
pub fn place<R: Rng>(
    rng: &mut R,
    element: Size,
    bounds: Size,
    exclusions: &[Rect],
    max_attempts: u32,
) -> Placement {
    let span_x = bounds.w - element.w - 2.0 * EDGE_MARGIN;
    let span_y = bounds.h - element.h - 2.0 * EDGE_MARGIN;

    let mut x = EDGE_MARGIN;
    let mut y = EDGE_MARGIN;
    for _ in 0..max_attempts {
        // Degenerate containers leave no room to draw from; the margin
        // corner is the only candidate.
        x = if span_x > 0.0 {
            rng.gen_range(0.0..span_x) + EDGE_MARGIN
        } else {
            EDGE_MARGIN
        };
        y = if span_y > 0.0 {
            rng.gen_range(0.0..span_y) + EDGE_MARGIN
        } else {
            EDGE_MARGIN
        };

        let candidate = Rect {
            x,
            y,
            w: element.w,
            h: element.h,
        };
        if !exclusions.iter().any(|ex| candidate.overlaps(ex)) {
            return Placement {
                x,
                y,
                degraded: false,
            };
        }
    }

    Placement {
        x,
        y,
        degraded: true,
    }
}
