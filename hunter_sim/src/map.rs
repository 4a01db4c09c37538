// The immutable game map.
//
// `GameMap` is built once at startup from a `MapLayout` (or the built-in
// `GameMap::standard()` layout) and shared by reference with every step. It
// holds a dense walkability grid, the precomputed row-major table of all
// walkable tiles (used for uniform tile draws), the legacy spawn strips in
// the four corners, the harvest areas with their share of each block's
// treasure, and the crown's start tile and respawn candidates.
//
// Nothing here is part of the serialized world state; a map is identified by
// the config a node runs with.
//
// See also: `config.rs` for the fork-dependent rules, `step.rs` which reads
// the harvest areas and walkable-tile table.
//
// **Critical constraint: determinism.** `walkable_tiles()` is sorted in
// `Coord` order and random draws index into it. Harvest-area tile lists are
// also indexed by random draws, so their order is part of consensus.

use crate::types::{Amount, Coord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map dimensions {width}x{height} are too small for spawn strips of length {spawn_area_length}")]
    TooSmall {
        width: i32,
        height: i32,
        spawn_area_length: i32,
    },
    #[error("{what} tile {coord} is not walkable")]
    NotWalkable { what: &'static str, coord: Coord },
    #[error("harvest area {0} has no tiles")]
    EmptyHarvestArea(usize),
    #[error("no crown respawn locations")]
    NoCrownSpawns,
    #[error("no walkable tile outside the spawn strips for hearts")]
    NoHeartTiles,
    #[error("harvest portions ({portions}) plus crown bonus ({crown}) must equal the total ({total})")]
    PortionMismatch { portions: i64, crown: i64, total: i64 },
}

/// One harvest area: where part of each block's treasure is dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestArea {
    /// Share of the treasure, in units of `MapLayout::total_harvest`.
    pub portion: i64,
    /// Candidate tiles; one is drawn uniformly per block.
    pub tiles: Vec<Coord>,
}

/// Raw description of a map, loadable from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayout {
    pub width: i32,
    pub height: i32,
    pub spawn_area_length: i32,
    pub obstacles: Vec<Coord>,
    pub harvest_areas: Vec<HarvestArea>,
    pub crown_bonus_portion: i64,
    pub total_harvest: i64,
    pub crown_start: Coord,
    pub crown_spawns: Vec<Coord>,
}

// ---------------------------------------------------------------------------
// Standard layout
// ---------------------------------------------------------------------------

pub const STANDARD_WIDTH: i32 = 502;
pub const STANDARD_HEIGHT: i32 = 502;
pub const STANDARD_SPAWN_AREA_LENGTH: i32 = 15;

/// (centre, half-size, portion) of each standard harvest area.
const STANDARD_HARVEST: [(Coord, i32, i64); 7] = [
    (Coord::new(250, 250), 4, 20),
    (Coord::new(100, 100), 3, 15),
    (Coord::new(400, 100), 3, 10),
    (Coord::new(400, 400), 3, 10),
    (Coord::new(100, 400), 3, 8),
    (Coord::new(250, 60), 2, 7),
    (Coord::new(250, 440), 2, 5),
];

const STANDARD_CROWN_SPAWNS: [Coord; 8] = [
    Coord::new(250, 248),
    Coord::new(160, 160),
    Coord::new(340, 160),
    Coord::new(340, 340),
    Coord::new(160, 340),
    Coord::new(60, 250),
    Coord::new(440, 250),
    Coord::new(250, 150),
];

/// Blocky obstacle pattern of the standard map, keeping the border clear.
fn standard_obstacle(x: i32, y: i32) -> bool {
    if x <= 1 || y <= 1 || x >= STANDARD_WIDTH - 2 || y >= STANDARD_HEIGHT - 2 {
        return false;
    }
    let (cx, cy) = (x / 12, y / 12);
    let (fx, fy) = (x % 12, y % 12);
    (cx * 7 + cy * 3) % 5 == 0 && (3..=8).contains(&fx) && (3..=8).contains(&fy)
}

impl MapLayout {
    pub fn standard() -> Self {
        let harvest_areas: Vec<HarvestArea> = STANDARD_HARVEST
            .iter()
            .map(|&(centre, half, portion)| {
                let mut tiles = Vec::new();
                for y in centre.y - half..=centre.y + half {
                    for x in centre.x - half..=centre.x + half {
                        tiles.push(Coord::new(x, y));
                    }
                }
                HarvestArea { portion, tiles }
            })
            .collect();

        let reserved = |c: Coord| {
            STANDARD_CROWN_SPAWNS.contains(&c)
                || harvest_areas.iter().any(|a| a.tiles.contains(&c))
        };
        let mut obstacles = Vec::new();
        for y in 0..STANDARD_HEIGHT {
            for x in 0..STANDARD_WIDTH {
                let c = Coord::new(x, y);
                if standard_obstacle(x, y) && !reserved(c) {
                    obstacles.push(c);
                }
            }
        }

        Self {
            width: STANDARD_WIDTH,
            height: STANDARD_HEIGHT,
            spawn_area_length: STANDARD_SPAWN_AREA_LENGTH,
            obstacles,
            harvest_areas,
            crown_bonus_portion: 25,
            total_harvest: 100,
            crown_start: STANDARD_CROWN_SPAWNS[0],
            crown_spawns: STANDARD_CROWN_SPAWNS.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// GameMap
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct GameMap {
    width: i32,
    height: i32,
    spawn_area_length: i32,
    walkable: Vec<bool>,
    walkable_tiles: Vec<Coord>,
    harvest_areas: Vec<HarvestArea>,
    crown_bonus_portion: i64,
    total_harvest: i64,
    crown_start: Coord,
    crown_spawns: Vec<Coord>,
}

impl GameMap {
    /// Build and validate a map.
    pub fn new(layout: MapLayout) -> Result<Self, MapError> {
        let MapLayout {
            width,
            height,
            spawn_area_length,
            obstacles,
            harvest_areas,
            crown_bonus_portion,
            total_harvest,
            crown_start,
            crown_spawns,
        } = layout;

        if spawn_area_length < 1 || width < 2 * spawn_area_length || height < 2 * spawn_area_length
        {
            return Err(MapError::TooSmall {
                width,
                height,
                spawn_area_length,
            });
        }

        let mut map = Self {
            width,
            height,
            spawn_area_length,
            walkable: vec![true; (width * height) as usize],
            walkable_tiles: Vec::new(),
            harvest_areas,
            crown_bonus_portion,
            total_harvest,
            crown_start,
            crown_spawns,
        };
        for c in obstacles {
            if let Some(i) = map.index(c) {
                map.walkable[i] = false;
            }
        }
        for y in 0..height {
            for x in 0..width {
                let c = Coord::new(x, y);
                if map.is_walkable(c) {
                    map.walkable_tiles.push(c);
                }
            }
        }

        map.validate()?;
        Ok(map)
    }

    /// The default 502x502 map.
    pub fn standard() -> Self {
        match Self::new(MapLayout::standard()) {
            Ok(map) => map,
            Err(e) => panic!("built-in map layout is invalid: {e}"),
        }
    }

    fn validate(&self) -> Result<(), MapError> {
        let check = |what: &'static str, coord: Coord| {
            if self.is_walkable(coord) {
                Ok(())
            } else {
                Err(MapError::NotWalkable { what, coord })
            }
        };
        for c in self.original_spawn_tiles() {
            check("spawn", c)?;
        }
        if self
            .walkable_tiles
            .iter()
            .all(|&c| self.is_original_spawn_area(c))
        {
            return Err(MapError::NoHeartTiles);
        }
        check("crown start", self.crown_start)?;
        if self.crown_spawns.is_empty() {
            return Err(MapError::NoCrownSpawns);
        }
        for &c in &self.crown_spawns {
            check("crown spawn", c)?;
        }
        let mut portions = 0;
        for (i, area) in self.harvest_areas.iter().enumerate() {
            if area.tiles.is_empty() {
                return Err(MapError::EmptyHarvestArea(i));
            }
            for &c in &area.tiles {
                check("harvest", c)?;
            }
            portions += area.portion;
        }
        if portions + self.crown_bonus_portion != self.total_harvest || self.total_harvest <= 0 {
            return Err(MapError::PortionMismatch {
                portions,
                crown: self.crown_bonus_portion,
                total: self.total_harvest,
            });
        }
        Ok(())
    }

    fn index(&self, c: Coord) -> Option<usize> {
        self.in_bounds(c)
            .then(|| (c.y * self.width + c.x) as usize)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn spawn_area_length(&self) -> i32 {
        self.spawn_area_length
    }

    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && c.x < self.width && c.y < self.height
    }

    pub fn is_walkable(&self, c: Coord) -> bool {
        self.index(c).is_some_and(|i| self.walkable[i])
    }

    /// All walkable tiles in `Coord` order.
    pub fn walkable_tiles(&self) -> &[Coord] {
        &self.walkable_tiles
    }

    pub fn harvest_areas(&self) -> &[HarvestArea] {
        &self.harvest_areas
    }

    pub fn crown_bonus_portion(&self) -> i64 {
        self.crown_bonus_portion
    }

    pub fn total_harvest(&self) -> i64 {
        self.total_harvest
    }

    pub fn crown_start(&self) -> Coord {
        self.crown_start
    }

    pub fn crown_spawns(&self) -> &[Coord] {
        &self.crown_spawns
    }

    // -----------------------------------------------------------------------
    // Legacy spawn strips
    // -----------------------------------------------------------------------

    /// Whether `c` lies on one of the four L-shaped corner spawn strips.
    pub fn is_original_spawn_area(&self, c: Coord) -> bool {
        let l = self.spawn_area_length;
        let (w, h) = (self.width, self.height);
        ((c.x == 0 || c.x == w - 1) && (c.y < l || c.y >= h - l))
            || ((c.y == 0 || c.y == h - 1) && (c.x < l || c.x >= w - l))
    }

    /// All spawn-strip tiles in `Coord` order.
    pub fn original_spawn_tiles(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .map(move |x| Coord::new(x, y))
                .filter(move |&c| self.is_original_spawn_area(c))
        })
    }

    /// Move a coordinate one step off the spawn strip it lies on, if any.
    pub fn push_out_of_spawn_area(&self, c: Coord) -> Coord {
        if !self.is_original_spawn_area(c) {
            return c;
        }
        let (w, h) = (self.width, self.height);
        if c.x == 0 {
            if c.y == 0 {
                Coord::new(c.x + 1, c.y + 1)
            } else if c.y == h - 1 {
                Coord::new(c.x + 1, c.y - 1)
            } else {
                Coord::new(c.x + 1, c.y)
            }
        } else if c.x == w - 1 {
            if c.y == 0 {
                Coord::new(c.x - 1, c.y + 1)
            } else if c.y == h - 1 {
                Coord::new(c.x - 1, c.y - 1)
            } else {
                Coord::new(c.x - 1, c.y)
            }
        } else if c.y == 0 {
            Coord::new(c.x, c.y + 1)
        } else if c.y == h - 1 {
            Coord::new(c.x, c.y - 1)
        } else {
            c
        }
    }

    /// Number of tiles in one team's corner strip.
    pub fn spawn_strip_len(&self) -> u32 {
        (2 * self.spawn_area_length - 1) as u32
    }

    /// The `pos`-th tile of a team's corner strip, and the direction that
    /// faces into the map from there.
    ///
    /// Team 0 owns the top-left corner, 1 top-right, 2 bottom-right and 3
    /// bottom-left. Positions run down the vertical leg towards the corner,
    /// then along the horizontal leg.
    pub fn spawn_tile(&self, color: u8, pos: u32) -> (Coord, u8) {
        let l = self.spawn_area_length;
        let pos = pos as i32;
        let (x, y) = if pos < l { (0, l - 1 - pos) } else { (pos - l + 1, 0) };
        let (w, h) = (self.width, self.height);
        match color {
            0 => (Coord::new(x, y), 3),
            1 => (Coord::new(w - 1 - x, y), 1),
            2 => (Coord::new(w - 1 - x, h - 1 - y), 7),
            _ => (Coord::new(x, h - 1 - y), 9),
        }
    }
}
