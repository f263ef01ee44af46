//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path degli artifact.
//! Il path è funzione pura di (stem, profilo, encoding):
//! `<output_root>/<profilo>/<stem>.<ext>`

use crate::profile::{Encoding, OutputProfile, ProfileCatalog};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Calcola il path dell'artifact per una sorgente
    pub fn artifact_path(
        output_root: &Path,
        profile: &OutputProfile,
        source_stem: &str,
        encoding: Encoding,
    ) -> PathBuf {
        output_root
            .join(&profile.name)
            .join(format!("{}.{}", source_stem, encoding.extension()))
    }

    /// Directory di un profilo
    pub fn profile_dir(output_root: &Path, profile: &OutputProfile) -> PathBuf {
        output_root.join(&profile.name)
    }

    /// Crea le directory di tutti i profili prima della generazione
    pub async fn ensure_profile_dirs(output_root: &Path, catalog: &ProfileCatalog) -> std::io::Result<()> {
        for profile in catalog.iter() {
            let dir = Self::profile_dir(output_root, profile);
            tokio::fs::create_dir_all(&dir).await?;
            debug!("Profile directory ready: {}", dir.display());
        }
        Ok(())
    }

    /// Path relativo alla root del repository, per git e per gli URL
    pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
        path.strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_path_is_deterministic() {
        let profile = OutputProfile::new("thumb", 300, 300, 70);
        let root = Path::new("/repo/optimizadas/Anillos");

        let webp = PathResolver::artifact_path(root, &profile, "AN-001", Encoding::WebP);
        let jpg = PathResolver::artifact_path(root, &profile, "AN-001", Encoding::Jpeg);

        assert_eq!(webp, PathBuf::from("/repo/optimizadas/Anillos/thumb/AN-001.webp"));
        assert_eq!(jpg, PathBuf::from("/repo/optimizadas/Anillos/thumb/AN-001.jpg"));
        assert_eq!(webp, PathResolver::artifact_path(root, &profile, "AN-001", Encoding::WebP));
    }

    #[test]
    fn test_relative_to() {
        let rel = PathResolver::relative_to(Path::new("/repo"), Path::new("/repo/optimizadas/a.jpg"));
        assert_eq!(rel, PathBuf::from("optimizadas/a.jpg"));

        let outside = PathResolver::relative_to(Path::new("/repo"), Path::new("/elsewhere/a.jpg"));
        assert_eq!(outside, PathBuf::from("/elsewhere/a.jpg"));
    }

    #[tokio::test]
    async fn test_ensure_profile_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();

        PathResolver::ensure_profile_dirs(temp_dir.path(), &catalog).await.unwrap();

        for name in ["thumb", "medium", "large"] {
            assert!(temp_dir.path().join(name).is_dir());
        }
    }
}
