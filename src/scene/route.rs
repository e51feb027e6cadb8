//! Active route preference, owned by the scene controller and passed to
//! whatever needs it instead of living in process-wide state.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// Height of the highlighted route path above the floorplan origin.
pub const ACTIVE_PATH_HEIGHT: f64 = 12.0;

/// Height of the other route paths.
pub const INACTIVE_PATH_HEIGHT: f64 = 9.0;

/// Which route through the building the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutePreference {
    #[default]
    Normal,
    /// Step-free route.
    Accessible,
    WellLit,
}

impl RoutePreference {
    pub const ALL: [RoutePreference; 3] = [Self::Normal, Self::Accessible, Self::WellLit];

    /// Resolve the menu toggles. Accessible wins over well-lit.
    pub fn from_toggles(accessible: bool, well_lit: bool) -> Self {
        if accessible {
            Self::Accessible
        } else if well_lit {
            Self::WellLit
        } else {
            Self::Normal
        }
    }

    /// Tag the route's path geometry is labelled with.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Accessible => "Access",
            Self::WellLit => "WellLit",
        }
    }
}

impl fmt::Display for RoutePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RoutePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "accessible" | "access" => Ok(Self::Accessible),
            "well-lit" | "well_lit" | "welllit" => Ok(Self::WellLit),
            other => bail!("unknown route preference {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathColor {
    Highlight,
    Muted,
}

/// How one route path should be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStyle {
    pub color: PathColor,
    pub height: f64,
}

/// Scene-scoped context handed to presentation components.
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    route: RoutePreference,
}

impl SceneContext {
    pub fn new(route: RoutePreference) -> Self {
        Self { route }
    }

    pub fn route(&self) -> RoutePreference {
        self.route
    }

    pub fn set_route(&mut self, route: RoutePreference) {
        self.route = route;
    }

    /// Style for the path belonging to `route`.
    pub fn path_style(&self, route: RoutePreference) -> PathStyle {
        if route == self.route {
            PathStyle {
                color: PathColor::Highlight,
                height: ACTIVE_PATH_HEIGHT,
            }
        } else {
            PathStyle {
                color: PathColor::Muted,
                height: INACTIVE_PATH_HEIGHT,
            }
        }
    }
}
