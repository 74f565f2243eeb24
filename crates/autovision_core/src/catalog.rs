//! Display metadata for known specification keys.

use std::borrow::Cow;

/// Pictogram shown next to a specification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecIcon {
    Engine,
    Bolt,
    Cog,
    Cylinders,
    Turbo,
    Gearbox,
    Fuel,
    Gauge,
    Door,
    Seat,
    Stopwatch,
    Wheels,
    /// Placeholder for keys the catalog does not know.
    Generic,
}

impl SpecIcon {
    /// Single glyph used by the desktop shell.
    pub fn glyph(self) -> &'static str {
        match self {
            SpecIcon::Engine => "⛭",
            SpecIcon::Bolt => "⚡",
            SpecIcon::Cog => "⚙",
            SpecIcon::Cylinders => "▥",
            SpecIcon::Turbo => "◎",
            SpecIcon::Gearbox => "✥",
            SpecIcon::Fuel => "⛽",
            SpecIcon::Gauge => "◷",
            SpecIcon::Door => "▯",
            SpecIcon::Seat => "⑁",
            SpecIcon::Stopwatch => "⏱",
            SpecIcon::Wheels => "⚯",
            SpecIcon::Generic => "📊",
        }
    }
}

/// Label, unit and icon for one specification field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDescriptor {
    pub label: Cow<'static, str>,
    /// Empty when the field is unitless.
    pub unit: &'static str,
    pub icon: SpecIcon,
}

impl SpecDescriptor {
    const fn known(label: &'static str, unit: &'static str, icon: SpecIcon) -> Self {
        Self {
            label: Cow::Borrowed(label),
            unit,
            icon,
        }
    }

    /// Descriptor for a key missing from the catalog: the raw key as label.
    pub fn fallback(key: &str) -> Self {
        Self {
            label: Cow::Owned(key.to_string()),
            unit: "",
            icon: SpecIcon::Generic,
        }
    }
}

/// Canonical descriptor for engine displacement in litres.
pub const DISPLACEMENT: SpecDescriptor =
    SpecDescriptor::known("Displacement", "L", SpecIcon::Engine);

static CATALOG: &[(&str, SpecDescriptor)] = &[
    ("displacement", DISPLACEMENT),
    ("displacement_l", DISPLACEMENT),
    ("bhp", SpecDescriptor::known("Power", "BHP", SpecIcon::Bolt)),
    ("torque_nm", SpecDescriptor::known("Torque", "Nm", SpecIcon::Cog)),
    ("cylinders", SpecDescriptor::known("Cylinders", "", SpecIcon::Cylinders)),
    ("aspiration", SpecDescriptor::known("Aspiration", "", SpecIcon::Turbo)),
    ("gearbox", SpecDescriptor::known("Gearbox", "", SpecIcon::Gearbox)),
    ("fuel", SpecDescriptor::known("Fuel Type", "", SpecIcon::Fuel)),
    ("top_speed_kmh", SpecDescriptor::known("Top Speed", "km/h", SpecIcon::Gauge)),
    ("max_speed", SpecDescriptor::known("Max Speed", "km/h", SpecIcon::Gauge)),
    ("doors", SpecDescriptor::known("Doors", "", SpecIcon::Door)),
    ("seats", SpecDescriptor::known("Seats", "", SpecIcon::Seat)),
    ("acceleration", SpecDescriptor::known("Acceleration", "s", SpecIcon::Stopwatch)),
    ("drive_type", SpecDescriptor::known("Drive Type", "", SpecIcon::Wheels)),
];

/// Look up a known key.
pub fn lookup(key: &str) -> Option<&'static SpecDescriptor> {
    CATALOG.iter().find(|(k, _)| *k == key).map(|(_, d)| d)
}

/// Look up a key, falling back to a generic descriptor for unknown keys.
pub fn describe(key: &str) -> SpecDescriptor {
    lookup(key)
        .cloned()
        .unwrap_or_else(|| SpecDescriptor::fallback(key))
}

/// Keys whose numeric values are engine displacement in an unknown unit.
pub fn is_displacement_key(key: &str) -> bool {
    matches!(key, "displacement" | "displacement_l")
}
