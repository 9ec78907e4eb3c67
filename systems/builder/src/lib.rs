#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement system that turns pointer input into tower placement commands.
//!
//! Checks run in a fixed order and stop at the first failure: affordability,
//! side ownership in cooperative matches, path clearance, then clearance from
//! every placed tower (local and replicated alike). A rejected attempt emits
//! nothing.

use brain_defense_core::{
    Catalog, Command, Path, PlacementError, Point, Side, TowerKind, TowerState, Viewport,
};

/// Minimum distance in pixels between a tower and any path segment.
pub const PATH_CLEARANCE: f32 = 40.0;

/// Minimum distance in pixels between two towers.
pub const TOWER_CLEARANCE: f32 = 50.0;

/// Configuration parameters required to construct the builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    side: Option<Side>,
    path_clearance: f32,
    tower_clearance: f32,
}

impl Config {
    /// Configuration for single-player matches, which may build anywhere.
    #[must_use]
    pub const fn solo() -> Self {
        Self {
            side: None,
            path_clearance: PATH_CLEARANCE,
            tower_clearance: TOWER_CLEARANCE,
        }
    }

    /// Configuration for cooperative matches restricted to `side`.
    #[must_use]
    pub const fn restricted_to(side: Side) -> Self {
        Self {
            side: Some(side),
            ..Self::solo()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::solo()
    }
}

/// Read-only state consulted while validating a placement.
#[derive(Clone, Copy, Debug)]
pub struct PlacementContext<'a> {
    /// Authoritative balance at the moment of the attempt.
    pub balance: u32,
    /// Tower records providing cost.
    pub catalog: &'a Catalog,
    /// Path the tower must keep clear of.
    pub path: &'a Path,
    /// Viewport the pointer and path are expressed in.
    pub viewport: Viewport,
    /// Every tower already on the map.
    pub towers: &'a [TowerState],
}

/// Declarative placement preview describing a potential tower construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementPreview {
    /// Kind of tower proposed for placement.
    pub kind: TowerKind,
    /// Pointer position in viewport pixels.
    pub position: Point,
    /// Reason the placement would be rejected, if any.
    pub rejection: Option<PlacementError>,
}

impl PlacementPreview {
    /// Reports whether the previewed placement would succeed.
    #[must_use]
    pub const fn placeable(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Pure system validating placement attempts.
#[derive(Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Creates a builder using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Validates a placement of `kind` at `pointer`.
    pub fn validate(
        &self,
        kind: TowerKind,
        pointer: Point,
        context: &PlacementContext<'_>,
    ) -> Result<(), PlacementError> {
        let config = context
            .catalog
            .tower(kind)
            .ok_or(PlacementError::Unavailable(kind))?;
        if context.balance < config.cost {
            return Err(PlacementError::InsufficientFunds {
                required: config.cost,
                available: context.balance,
            });
        }

        if let Some(assigned) = self.config.side {
            if context.viewport.side_of(pointer) != assigned {
                return Err(PlacementError::WrongSide { assigned });
            }
        }

        let distance = context.path.clearance(pointer, context.viewport);
        if distance <= self.config.path_clearance {
            return Err(PlacementError::TooCloseToPath { distance });
        }

        let blocking = context
            .towers
            .iter()
            .find(|tower| tower.position.distance(pointer) <= self.config.tower_clearance);
        if let Some(tower) = blocking {
            return Err(PlacementError::TooCloseToTower { tower: tower.id });
        }

        Ok(())
    }

    /// Describes whether a placement at `pointer` would succeed.
    #[must_use]
    pub fn preview(
        &self,
        kind: TowerKind,
        pointer: Point,
        context: &PlacementContext<'_>,
    ) -> PlacementPreview {
        PlacementPreview {
            kind,
            position: pointer,
            rejection: self.validate(kind, pointer, context).err(),
        }
    }

    /// Validates the attempt and, on success, emits the placement command.
    pub fn handle(
        &mut self,
        kind: TowerKind,
        pointer: Point,
        context: &PlacementContext<'_>,
        out: &mut Vec<Command>,
    ) -> Result<(), PlacementError> {
        self.validate(kind, pointer, context)?;
        out.push(Command::PlaceTower {
            kind,
            position: pointer,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_config_keeps_default_clearances() {
        let config = Config::restricted_to(Side::Right);
        assert_eq!(config.side, Some(Side::Right));
        assert_eq!(config.path_clearance, PATH_CLEARANCE);
        assert_eq!(config.tower_clearance, TOWER_CLEARANCE);
    }

    #[test]
    fn unknown_kind_is_unavailable() {
        let builder = Builder::default();
        let context = PlacementContext {
            balance: 1_000,
            catalog: &Catalog::empty(),
            path: &Path::standard(),
            viewport: Viewport::default(),
            towers: &[],
        };
        assert_eq!(
            builder.validate(TowerKind::Trulimero, Point::new(300.0, 300.0), &context),
            Err(PlacementError::Unavailable(TowerKind::Trulimero))
        );
    }
}
