use rand::Rng;
use tracing::warn;

use crate::geom::{Area, Position};
use crate::map::Map;

use super::types::WorldError;

/// Picks a monster spawn cell around `hint`. `width`/`height` are half-extents.
///
/// - zero extent with a non-zero hint on both axes: the hint itself, unchecked.
/// - everything zero: anywhere walkable on the map.
/// - otherwise: a walkable cell in the clipped rectangle, falling back to the
///   whole map and finally to the bounds midpoint.
pub fn place<R: Rng + ?Sized>(
    map: &Map,
    hint: Position,
    width: i32,
    height: i32,
    rng: &mut R,
) -> Position {
    if width == 0 && height == 0 && hint.x != 0 && hint.y != 0 {
        return hint;
    }

    let area = if hint.is_zero() && width == 0 && height == 0 {
        map.bounds()
    } else {
        Area::around_point(hint, width, height).clipped_to(map.bounds())
    };

    if let Some(position) = map.find_position_in_range(area, rng) {
        return position;
    }

    warn!(
        map = map.code(),
        hint = %hint,
        width,
        height,
        "spawn_area_unwalkable"
    );
    map.find_position_in_range(map.bounds(), rng)
        .unwrap_or_else(|| map.bounds().midpoint())
}

/// Picks a player spawn cell inside `spawn_area`. A zero area means the whole
/// map; a single-cell area is used as is.
pub fn place_player<R: Rng + ?Sized>(
    map: &Map,
    spawn_area: Area,
    rng: &mut R,
    retry_limit: u32,
) -> Result<Position, WorldError> {
    let mut area = if spawn_area.is_zero() {
        map.bounds()
    } else {
        spawn_area
    };

    if area.width() <= 1 && area.height() <= 1 {
        return Ok(area.midpoint());
    }

    if map.walk_data().walkable_count() == 0 {
        return Err(WorldError::NoWalkableCell {
            map_code: map.code().to_string(),
        });
    }

    let retry_limit = retry_limit.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if attempt > retry_limit {
            warn!(map = map.code(), area = %area, "player_spawn_area_exhausted");
            area = map.bounds();
            attempt = 0;
        }

        let candidate = area.random_point(rng);
        if map.is_walkable(candidate) {
            return Ok(candidate);
        }
    }
}
