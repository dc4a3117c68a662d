//! Chart colour palettes, including colour-blind friendly sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SeriesError;

const DEFAULT: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#0173b2", "#de8f05", "#cc78bc", "#ca9161", "#949494", "#3498db",
    "#e74c3c", "#2ecc71", "#f39c12", "#9b59b6",
];

const VIBRANT: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B88B", "#ABEBC6", "#F1948A", "#D7BDE2", "#A9DFBF", "#F9E79F", "#D5F4E6", "#FADBD8",
    "#EBDEF0", "#D5F4E6", "#FCF3CF", "#FDEBD0",
];

const OCEAN: [&str; 20] = [
    "#006994", "#0088CC", "#00AADD", "#00CCFF", "#33DDFF", "#0055AA", "#0077BB", "#0099DD",
    "#00BBEE", "#33EEFF", "#004477", "#006699", "#0088BB", "#00AADD", "#00CCFF", "#003366",
    "#005588", "#0077AA", "#0099CC", "#00BBEE",
];

const FOREST: [&str; 20] = [
    "#1B5E20", "#2E7D32", "#388E3C", "#43A047", "#4CAF50", "#0D3818", "#1B5E20", "#2E7D32",
    "#558B2F", "#689F38", "#00695C", "#00796B", "#00897B", "#009688", "#26A69A", "#004D40",
    "#00695C", "#00796B", "#00897B", "#009688",
];

const PROTANOPIA: [&str; 25] = [
    "#0173B2", "#DE8F05", "#CC78BC", "#CA9161", "#949494", "#ECE133", "#56B4E9", "#009E73",
    "#F0E442", "#D55E00", "#0072B2", "#E69F00", "#56B4E9", "#009E73", "#F0E442", "#D55E00",
    "#CC79A7", "#999999", "#332288", "#88CCEE", "#44AA99", "#117733", "#DDCC77", "#CC6677",
    "#AA4499",
];

const DEUTERANOPIA: [&str; 25] = [
    "#0173B2", "#DE8F05", "#CC78BC", "#CA9161", "#949494", "#ECE133", "#56B4E9", "#D55E00",
    "#F0E442", "#009E73", "#0072B2", "#E69F00", "#56B4E9", "#D55E00", "#F0E442", "#009E73",
    "#CC79A7", "#999999", "#332288", "#88CCEE", "#44AA99", "#117733", "#DDCC77", "#CC6677",
    "#AA4499",
];

const ACHROMATIC: [&str; 20] = [
    "#000000", "#1A1A1A", "#333333", "#4D4D4D", "#666666", "#808080", "#999999", "#B3B3B3",
    "#CCCCCC", "#E6E6E6", "#0D0D0D", "#262626", "#404040", "#595959", "#737373", "#8C8C8C",
    "#A6A6A6", "#BFBFBF", "#D9D9D9", "#F2F2F2",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPalette {
    #[default]
    Default,
    Vibrant,
    Ocean,
    Forest,
    Protanopia,
    Deuteranopia,
    Achromatic,
}

impl ChartPalette {
    pub const ALL: [ChartPalette; 7] = [
        Self::Default,
        Self::Vibrant,
        Self::Ocean,
        Self::Forest,
        Self::Protanopia,
        Self::Deuteranopia,
        Self::Achromatic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Vibrant => "vibrant",
            Self::Ocean => "ocean",
            Self::Forest => "forest",
            Self::Protanopia => "protanopia",
            Self::Deuteranopia => "deuteranopia",
            Self::Achromatic => "achromatic",
        }
    }

    pub fn swatches(self) -> &'static [&'static str] {
        match self {
            Self::Default => &DEFAULT,
            Self::Vibrant => &VIBRANT,
            Self::Ocean => &OCEAN,
            Self::Forest => &FOREST,
            Self::Protanopia => &PROTANOPIA,
            Self::Deuteranopia => &DEUTERANOPIA,
            Self::Achromatic => &ACHROMATIC,
        }
    }

    /// Colour for series `index`, cycling through the palette.
    pub fn color(self, index: usize) -> &'static str {
        let swatches = self.swatches();
        swatches[index % swatches.len()]
    }

    pub fn colors(self, count: usize) -> Vec<&'static str> {
        (0..count).map(|i| self.color(i)).collect()
    }
}

impl fmt::Display for ChartPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartPalette {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| SeriesError::UnknownPalette(s.to_string()))
    }
}

/// Theme choice handed to the chart builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemePreference {
    pub palette: ChartPalette,
    pub dark: bool,
}

impl ThemePreference {
    pub fn grid_color(&self) -> &'static str {
        if self.dark { "#475569" } else { "#cbd5e1" }
    }

    pub fn text_color(&self) -> &'static str {
        if self.dark { "#94a3b8" } else { "#475569" }
    }
}

/// `#rrggbb` (or `rrggbb`) to a CSS `rgba(...)` string.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Result<String, SeriesError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(SeriesError::InvalidColor(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| SeriesError::InvalidColor(hex.to_string()))
    };
    let (r, g, b) = (channel(0..2)?, channel(2..4)?, channel(4..6)?);
    Ok(format!("rgba({r}, {g}, {b}, {})", alpha.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_cycle() {
        let p = ChartPalette::Default;
        assert_eq!(p.color(0), "#1f77b4");
        assert_eq!(p.color(20), p.color(0));
        assert_eq!(p.colors(3), vec!["#1f77b4", "#ff7f0e", "#2ca02c"]);
        assert_eq!(ChartPalette::Protanopia.colors(30).len(), 30);
    }

    #[test]
    fn palette_names_round_trip() {
        for p in ChartPalette::ALL {
            assert_eq!(p.to_string().parse::<ChartPalette>().unwrap(), p);
        }
        assert!("pastel".parse::<ChartPalette>().is_err());
    }

    #[test]
    fn hex_conversion() {
        assert_eq!(hex_to_rgba("#3b82f6", 0.7).unwrap(), "rgba(59, 130, 246, 0.7)");
        assert_eq!(hex_to_rgba("FFFFFF", 2.0).unwrap(), "rgba(255, 255, 255, 1)");
        assert!(hex_to_rgba("#fff", 1.0).is_err());
        assert!(hex_to_rgba("#zzzzzz", 1.0).is_err());
    }
}
