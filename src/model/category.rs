//! built-in element categories
//!
//! category conditions match against these symbolic identifiers, never free
//! text. tokens parse from the plain name ("Walls"), the spaced label
//! ("Structural Columns") or the host identifier ("OST_StructuralColumns").

use std::fmt;

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Walls,
    Doors,
    Windows,
    Floors,
    Roofs,
    Ceilings,
    Columns,
    StructuralColumns,
    StructuralFraming,
    StructuralFoundation,
    Stairs,
    Railings,
    Rooms,
    Furniture,
    GenericModel,
    CurtainPanels,
    CurtainWallMullions,
    PlumbingFixtures,
    LightingFixtures,
    ElectricalEquipment,
    MechanicalEquipment,
    Pipes,
    Ducts,
    CableTray,
}

impl Category {
    pub const ALL: [Category; 24] = [
        Category::Walls,
        Category::Doors,
        Category::Windows,
        Category::Floors,
        Category::Roofs,
        Category::Ceilings,
        Category::Columns,
        Category::StructuralColumns,
        Category::StructuralFraming,
        Category::StructuralFoundation,
        Category::Stairs,
        Category::Railings,
        Category::Rooms,
        Category::Furniture,
        Category::GenericModel,
        Category::CurtainPanels,
        Category::CurtainWallMullions,
        Category::PlumbingFixtures,
        Category::LightingFixtures,
        Category::ElectricalEquipment,
        Category::MechanicalEquipment,
        Category::Pipes,
        Category::Ducts,
        Category::CableTray,
    ];

    /// human-readable label, used for substring matching
    pub fn label(&self) -> &'static str {
        match self {
            Category::Walls => "Walls",
            Category::Doors => "Doors",
            Category::Windows => "Windows",
            Category::Floors => "Floors",
            Category::Roofs => "Roofs",
            Category::Ceilings => "Ceilings",
            Category::Columns => "Columns",
            Category::StructuralColumns => "Structural Columns",
            Category::StructuralFraming => "Structural Framing",
            Category::StructuralFoundation => "Structural Foundations",
            Category::Stairs => "Stairs",
            Category::Railings => "Railings",
            Category::Rooms => "Rooms",
            Category::Furniture => "Furniture",
            Category::GenericModel => "Generic Models",
            Category::CurtainPanels => "Curtain Panels",
            Category::CurtainWallMullions => "Curtain Wall Mullions",
            Category::PlumbingFixtures => "Plumbing Fixtures",
            Category::LightingFixtures => "Lighting Fixtures",
            Category::ElectricalEquipment => "Electrical Equipment",
            Category::MechanicalEquipment => "Mechanical Equipment",
            Category::Pipes => "Pipes",
            Category::Ducts => "Ducts",
            Category::CableTray => "Cable Trays",
        }
    }

    /// host identifier, e.g. `OST_Walls`
    pub fn identifier(&self) -> String {
        format!("OST_{:?}", self)
    }

    /// parse a symbolic category token
    pub fn parse(token: &str) -> Option<Self> {
        let key = normalize(token);
        if key.is_empty() {
            return None;
        }

        Self::ALL
            .iter()
            .copied()
            .find(|c| normalize(&format!("{:?}", c)) == key || normalize(c.label()) == key)
    }

    /// known categories within `threshold` edits of `token`, closest first
    pub fn suggest(token: &str, threshold: usize) -> Vec<Category> {
        let key = normalize(token);
        let mut scored: Vec<(usize, Category)> = Self::ALL
            .iter()
            .map(|c| {
                let by_name = levenshtein(&key, &normalize(&format!("{:?}", c)));
                let by_label = levenshtein(&key, &normalize(c.label()));
                (by_name.min(by_label), *c)
            })
            .filter(|(distance, _)| *distance <= threshold)
            .collect();

        scored.sort();
        scored.into_iter().map(|(_, c)| c).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn normalize(token: &str) -> String {
    let trimmed = token.trim();
    let stripped = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ost_") => &trimmed[4..],
        _ => trimmed,
    };

    stripped
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
