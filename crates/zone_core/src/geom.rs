use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Sentinel for "no coordinate given, use the map's default placement".
    pub const ZERO: Position = Position { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Inclusive cell rectangle. `min_x..=max_x` by `min_y..=max_y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Area {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Area {
    pub const ZERO: Area = Area {
        min_x: 0,
        min_y: 0,
        max_x: 0,
        max_y: 0,
    };

    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds the rectangle `center ± (half_width, half_height)`.
    pub fn around_point(center: Position, half_width: i32, half_height: i32) -> Self {
        let half_width = half_width.max(0);
        let half_height = half_height.max(0);
        Self {
            min_x: center.x.saturating_sub(half_width),
            min_y: center.y.saturating_sub(half_height),
            max_x: center.x.saturating_add(half_width),
            max_y: center.y.saturating_add(half_height),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// An inverted rectangle, as left behind by clipping against disjoint bounds.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.max_x - self.min_x + 1
        }
    }

    pub fn height(&self) -> i32 {
        if self.is_empty() {
            0
        } else {
            self.max_y - self.min_y + 1
        }
    }

    pub fn mid_x(&self) -> i32 {
        self.min_x + (self.max_x - self.min_x) / 2
    }

    pub fn mid_y(&self) -> i32 {
        self.min_y + (self.max_y - self.min_y) / 2
    }

    pub fn midpoint(&self) -> Position {
        Position::new(self.mid_x(), self.mid_y())
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }

    /// Intersects with `bounds`. The result may be empty when the two do not overlap.
    pub fn clip_to(&mut self, bounds: Area) {
        self.min_x = self.min_x.max(bounds.min_x);
        self.min_y = self.min_y.max(bounds.min_y);
        self.max_x = self.max_x.min(bounds.max_x);
        self.max_y = self.max_y.min(bounds.max_y);
    }

    pub fn clipped_to(mut self, bounds: Area) -> Self {
        self.clip_to(bounds);
        self
    }

    /// Uniform cell inside the rectangle. An empty rectangle yields its min corner.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        if self.is_empty() {
            return Position::new(self.min_x, self.min_y);
        }
        Position::new(
            rng.gen_range(self.min_x..=self.max_x),
            rng.gen_range(self.min_y..=self.max_y),
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| Position::new(x, y)))
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{} - {},{}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
