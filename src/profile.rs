//! # Output Profiles Module
//!
//! Catalogo statico dei profili di output (bounding box + qualità) e degli
//! encoding prodotti per ogni profilo.
//!
//! ## Responsabilità:
//! - Definisce `OutputProfile` e `Encoding`
//! - Mantiene l'ordine di iterazione stabile dei profili (`ProfileCatalog`)
//! - Valida i profili: nomi unici e path-safe, box non nulli, qualità 1-100
//!
//! ## Catalogo di default:
//! | Profilo  | Box         | Qualità |
//! |----------|-------------|---------|
//! | thumb    | 300 x 300   | 70      |
//! | medium   | 800 x 800   | 80      |
//! | large    | 1200 x 1200 | 85      |
//!
//! I nomi dei profili fanno parte del path di output e quindi degli URL
//! pubblici: non vanno rinominati tra una run e l'altra.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Lossy encodings produced for every profile, in generation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    WebP,
    Jpeg,
}

impl Encoding {
    /// Fixed generation order: WebP first, JPEG as fallback
    pub const ALL: [Encoding; 2] = [Encoding::WebP, Encoding::Jpeg];

    /// File extension used in the artifact path
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::WebP => "webp",
            Encoding::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A named target size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputProfile {
    /// Unique key, also the output subdirectory name
    pub name: String,
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality (1-100)
    pub quality: u8,
}

impl OutputProfile {
    pub fn new(name: impl Into<String>, max_width: u32, max_height: u32, quality: u8) -> Self {
        Self {
            name: name.into(),
            max_width,
            max_height,
            quality,
        }
    }
}

/// Ordered, immutable set of output profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    profiles: Vec<OutputProfile>,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
        }
    }
}

/// The three e-commerce sizes the public URLs are documented against
pub fn default_profiles() -> Vec<OutputProfile> {
    vec![
        OutputProfile::new("thumb", 300, 300, 70),
        OutputProfile::new("medium", 800, 800, 80),
        OutputProfile::new("large", 1200, 1200, 85),
    ]
}

impl ProfileCatalog {
    /// Build a catalog, rejecting duplicates and out-of-range values
    pub fn new(profiles: Vec<OutputProfile>) -> Result<Self, String> {
        if profiles.is_empty() {
            return Err("At least one output profile is required".to_string());
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if profile.name.is_empty()
                || profile.name == "."
                || profile.name == ".."
                || profile.name.contains(['/', '\\'])
            {
                return Err(format!("Invalid profile name: {:?}", profile.name));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(format!("Duplicate profile name: {}", profile.name));
            }
            if profile.max_width == 0 || profile.max_height == 0 {
                return Err(format!("Profile {} has an empty bounding box", profile.name));
            }
            if profile.quality == 0 || profile.quality > 100 {
                return Err(format!("Profile {} quality must be between 1 and 100", profile.name));
            }
        }

        Ok(Self { profiles })
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputProfile> {
        self.profiles.iter()
    }

    /// Number of artifacts one successful source produces
    pub fn artifacts_per_source(&self) -> usize {
        self.profiles.len() * Encoding::ALL.len()
    }
}
