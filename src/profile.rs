//! Device profiles: the rendering and refresh budget for each viewport tier.
//!
//! The breakpoint table is configuration data, not logic. Classification is a
//! plain range lookup over a validated table, so alternative tables (kiosk
//! builds, test fixtures) can be swapped in without touching the classifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widths below this are handheld territory.
pub const BREAKPOINT_TABLET: u32 = 768;
/// Widths below this (and at or above [`BREAKPOINT_TABLET`]) are tablets.
pub const BREAKPOINT_LAPTOP: u32 = 1_366;
pub const BREAKPOINT_DESKTOP: u32 = 1_920;
pub const BREAKPOINT_COMMAND_CENTER: u32 = 3_840;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Smartphone,
    Tablet,
    Laptop,
    Desktop,
    CommandCenter,
}

impl DeviceClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smartphone => "smartphone",
            Self::Tablet => "tablet",
            Self::Laptop => "laptop",
            Self::Desktop => "desktop",
            Self::CommandCenter => "command_center",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map rendering fidelity requested from the map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapQuality {
    Low,
    Medium,
    High,
}

/// How much motion the presentation layer is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Animations {
    None,
    Reduced,
    Full,
}

/// Primary interaction modality expected for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchMode {
    Touch,
    Hybrid,
    Pointer,
}

/// Density of operator controls surfaced at a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlsTier {
    Compact,
    Standard,
    Extended,
    Full,
}

/// One row of the breakpoint table. The row matches viewport widths in
/// `[min_width, max_width)`; `max_width = None` means open-ended, which only
/// the widest row may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub name: DeviceClass,
    pub min_width: u32,
    pub max_width: Option<u32>,
    pub columns: u8,
    pub map_layers: u8,
    pub max_data_points: usize,
    pub base_refresh_interval_ms: u64,
    pub animations: Animations,
    pub touch_mode: TouchMode,
    pub controls: ControlsTier,
}

impl DeviceProfile {
    #[must_use]
    pub fn contains(&self, width: u32) -> bool {
        width >= self.min_width && self.max_width.is_none_or(|max| width < max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile table cannot be empty")]
    Empty,
    #[error("first profile must start at width 0, got {0}")]
    DoesNotStartAtZero(u32),
    #[error("profile '{name}' has an empty width range")]
    EmptyRange { name: DeviceClass },
    #[error("profile '{name}' has a data-point budget of zero")]
    ZeroBudget { name: DeviceClass },
    #[error("gap or overlap between '{prev}' and '{next}'")]
    Discontinuity { prev: DeviceClass, next: DeviceClass },
    #[error("only the widest profile may be open-ended, '{name}' is not last")]
    OpenEndedNotLast { name: DeviceClass },
    #[error("widest profile '{name}' must be open-ended")]
    UnboundedTail { name: DeviceClass },
    #[error("'{next}' narrows the budget of '{prev}'; budgets must grow with width")]
    NonMonotonicBudget { prev: DeviceClass, next: DeviceClass },
}

/// Validated, ascending, contiguous breakpoint table covering every width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DeviceProfile>", into = "Vec<DeviceProfile>")]
pub struct ProfileTable {
    rows: Vec<DeviceProfile>,
}

impl ProfileTable {
    pub fn new(rows: Vec<DeviceProfile>) -> Result<Self, ProfileError> {
        let first = rows.first().ok_or(ProfileError::Empty)?;
        if first.min_width != 0 {
            return Err(ProfileError::DoesNotStartAtZero(first.min_width));
        }
        for (index, row) in rows.iter().enumerate() {
            if row.max_data_points == 0 {
                return Err(ProfileError::ZeroBudget { name: row.name });
            }
            match row.max_width {
                Some(max) if max <= row.min_width => {
                    return Err(ProfileError::EmptyRange { name: row.name });
                }
                None if index + 1 != rows.len() => {
                    return Err(ProfileError::OpenEndedNotLast { name: row.name });
                }
                _ => {}
            }
        }
        for pair in rows.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.max_width != Some(next.min_width) {
                return Err(ProfileError::Discontinuity {
                    prev: prev.name,
                    next: next.name,
                });
            }
            if next.columns < prev.columns || next.max_data_points < prev.max_data_points {
                return Err(ProfileError::NonMonotonicBudget {
                    prev: prev.name,
                    next: next.name,
                });
            }
        }
        let last = &rows[rows.len() - 1];
        if last.max_width.is_some() {
            return Err(ProfileError::UnboundedTail { name: last.name });
        }
        Ok(Self { rows })
    }

    /// The production table: one row per hardware class the dashboard ships
    /// on, from handheld up to command-center wall displays.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            rows: vec![
                DeviceProfile {
                    name: DeviceClass::Smartphone,
                    min_width: 0,
                    max_width: Some(BREAKPOINT_TABLET),
                    columns: 1,
                    map_layers: 2,
                    max_data_points: 200,
                    base_refresh_interval_ms: 5_000,
                    animations: Animations::Reduced,
                    touch_mode: TouchMode::Touch,
                    controls: ControlsTier::Compact,
                },
                DeviceProfile {
                    name: DeviceClass::Tablet,
                    min_width: BREAKPOINT_TABLET,
                    max_width: Some(BREAKPOINT_LAPTOP),
                    columns: 2,
                    map_layers: 3,
                    max_data_points: 500,
                    base_refresh_interval_ms: 3_000,
                    animations: Animations::Full,
                    touch_mode: TouchMode::Touch,
                    controls: ControlsTier::Standard,
                },
                DeviceProfile {
                    name: DeviceClass::Laptop,
                    min_width: BREAKPOINT_LAPTOP,
                    max_width: Some(BREAKPOINT_DESKTOP),
                    columns: 3,
                    map_layers: 4,
                    max_data_points: 1_000,
                    base_refresh_interval_ms: 2_000,
                    animations: Animations::Full,
                    touch_mode: TouchMode::Hybrid,
                    controls: ControlsTier::Extended,
                },
                DeviceProfile {
                    name: DeviceClass::Desktop,
                    min_width: BREAKPOINT_DESKTOP,
                    max_width: Some(BREAKPOINT_COMMAND_CENTER),
                    columns: 4,
                    map_layers: 5,
                    max_data_points: 2_500,
                    base_refresh_interval_ms: 2_000,
                    animations: Animations::Full,
                    touch_mode: TouchMode::Pointer,
                    controls: ControlsTier::Full,
                },
                DeviceProfile {
                    name: DeviceClass::CommandCenter,
                    min_width: BREAKPOINT_COMMAND_CENTER,
                    max_width: None,
                    columns: 6,
                    map_layers: 6,
                    max_data_points: 5_000,
                    base_refresh_interval_ms: 1_000,
                    animations: Animations::Full,
                    touch_mode: TouchMode::Pointer,
                    controls: ControlsTier::Full,
                },
            ],
        }
    }

    /// Looks up the unique row whose range contains `width`.
    #[must_use]
    pub fn classify(&self, width: u32) -> &DeviceProfile {
        self.rows
            .iter()
            .find(|row| row.contains(width))
            .unwrap_or_else(|| &self.rows[self.rows.len() - 1])
    }

    #[must_use]
    pub fn rows(&self) -> &[DeviceProfile] {
        &self.rows
    }
}

impl TryFrom<Vec<DeviceProfile>> for ProfileTable {
    type Error = ProfileError;

    fn try_from(rows: Vec<DeviceProfile>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<ProfileTable> for Vec<DeviceProfile> {
    fn from(table: ProfileTable) -> Self {
        table.rows
    }
}
