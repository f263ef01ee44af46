//! # Derivative Generator Module
//!
//! Worker per la generazione dei derivati di una singola immagine sorgente.
//! Separato dall'orchestratore per poterlo testare senza git né directory
//! reali di sorgenti.
//!
//! ## Algoritmo:
//! 1. Decode una sola volta (trasparenza/palette → RGB opaco)
//! 2. Per ogni profilo, in ordine di catalogo: resize shrink-only
//! 3. Per ogni encoding (WebP, poi JPEG): encode alla qualità del profilo
//! 4. Scrittura sul path deterministico, sovrascrivendo
//!
//! ## Fallimenti:
//! - Il primo errore interrompe il lavoro di QUESTA sorgente
//! - Gli artifact già scritti restano su disco (nessun rollback)
//! - L'errore viene registrato nel `GenerationOutcome`, mai propagato

use crate::{
    codec::{DecodedImage, ImageCodec},
    error::{CodecError, GenerateError},
    file_manager::FileManager,
    pipeline::path_resolver::PathResolver,
    profile::{Encoding, ProfileCatalog},
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// A source image as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    path: PathBuf,
    stem: String,
    size_bytes: u64,
}

impl SourceImage {
    /// Read the file metadata and derive the stem
    pub fn from_path(path: &Path) -> Result<Self, GenerateError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GenerateError::InvalidName(path.to_path_buf()))?
            .to_string();

        let size_bytes = std::fs::metadata(path)
            .map_err(|e| GenerateError::Decode {
                path: path.to_path_buf(),
                source: CodecError::Io(e),
            })?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            stem,
            size_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// One written derivative file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source_stem: String,
    pub profile: String,
    pub encoding: Encoding,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Result of generating every derivative of one source
#[derive(Debug)]
pub struct GenerationOutcome {
    pub source: PathBuf,
    /// Decoded pixel size, `None` when decoding failed
    pub dimensions: Option<(u32, u32)>,
    /// Written artifacts in generation order (partial on failure)
    pub artifacts: Vec<Artifact>,
    pub failure: Option<GenerateError>,
}

impl GenerationOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Outcome for a source that could not even be opened
    pub fn rejected(source: &Path, failure: GenerateError) -> Self {
        Self {
            source: source.to_path_buf(),
            dimensions: None,
            artifacts: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Produces the profile × encoding derivative set for a source
pub struct DerivativeGenerator<C> {
    codec: C,
    output_root: PathBuf,
    catalog: ProfileCatalog,
}

impl<C: ImageCodec> DerivativeGenerator<C> {
    pub fn new(codec: C, output_root: impl Into<PathBuf>, catalog: ProfileCatalog) -> Self {
        Self {
            codec,
            output_root: output_root.into(),
            catalog,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    /// Genera tutti i derivati di una sorgente
    pub fn generate(&self, source: &SourceImage) -> GenerationOutcome {
        info!("🖼️  Generating: {} ({:.2} MB)", source.stem(), FileManager::size_in_mb(source.size_bytes()));

        let image = match self.codec.decode(source.path()) {
            Ok(image) => image,
            Err(e) => {
                let failure = GenerateError::Decode {
                    path: source.path().to_path_buf(),
                    source: e,
                };
                error!("   ❌ {}", failure);
                return GenerationOutcome::rejected(source.path(), failure);
            }
        };

        let dimensions = image.dimensions();
        debug!("Decoded {} at {}x{}", source.path().display(), dimensions.0, dimensions.1);

        let mut artifacts = Vec::with_capacity(self.catalog.artifacts_per_source());
        let failure = self.write_all_profiles(source, &image, &mut artifacts).err();

        if let Some(ref e) = failure {
            error!("   ❌ {} ({} artifacts left in place)", e, artifacts.len());
        }

        GenerationOutcome {
            source: source.path().to_path_buf(),
            dimensions: Some(dimensions),
            artifacts,
            failure,
        }
    }

    /// Scrive profilo per profilo; si ferma al primo errore
    fn write_all_profiles(
        &self,
        source: &SourceImage,
        image: &DecodedImage,
        artifacts: &mut Vec<Artifact>,
    ) -> Result<(), GenerateError> {
        for profile in self.catalog.iter() {
            let resized = self.codec.resize_to_fit(image, profile.max_width, profile.max_height);
            let mut sizes = Vec::with_capacity(Encoding::ALL.len());

            for encoding in Encoding::ALL {
                let bytes = self
                    .codec
                    .encode(&resized, encoding, profile.quality)
                    .map_err(|e| GenerateError::Encode {
                        profile: profile.name.clone(),
                        encoding: encoding.to_string(),
                        source: e,
                    })?;

                let path = PathResolver::artifact_path(&self.output_root, profile, source.stem(), encoding);
                std::fs::write(&path, &bytes).map_err(|e| GenerateError::Write {
                    path: path.clone(),
                    source: e,
                })?;

                sizes.push(format!("{} ({})", FileManager::format_size(bytes.len() as u64), encoding));
                artifacts.push(Artifact {
                    source_stem: source.stem().to_string(),
                    profile: profile.name.clone(),
                    encoding,
                    path,
                    size_bytes: bytes.len() as u64,
                });
            }

            info!(
                "   ✅ {} {}x{}: {}",
                profile.name,
                resized.width(),
                resized.height(),
                sizes.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NativeCodec;
    use crate::profile::OutputProfile;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([120, 60, 30])).save(&path).unwrap();
        path
    }

    fn prepared_output(temp_dir: &TempDir, catalog: &ProfileCatalog) -> PathBuf {
        let output = temp_dir.path().join("out");
        for profile in catalog.iter() {
            std::fs::create_dir_all(output.join(&profile.name)).unwrap();
        }
        output
    }

    fn count_files(dir: &Path) -> usize {
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count()
    }

    /// Codec che fallisce all'N-esimo encode
    struct FlakyCodec {
        inner: NativeCodec,
        fail_at: usize,
        calls: AtomicUsize,
    }

    impl ImageCodec for FlakyCodec {
        fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
            self.inner.decode(path)
        }

        fn resize_to_fit(&self, image: &DecodedImage, max_width: u32, max_height: u32) -> DecodedImage {
            self.inner.resize_to_fit(image, max_width, max_height)
        }

        fn encode(&self, image: &DecodedImage, encoding: Encoding, quality: u8) -> Result<Vec<u8>, CodecError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
                return Err(CodecError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "injected failure",
                )));
            }
            self.inner.encode(image, encoding, quality)
        }
    }

    #[test]
    fn test_generate_produces_full_set() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();
        let output = prepared_output(&temp_dir, &catalog);
        let source = SourceImage::from_path(&write_png(temp_dir.path(), "AN-001.png", 1600, 800)).unwrap();

        let generator = DerivativeGenerator::new(NativeCodec::new(), &output, catalog);
        let outcome = generator.generate(&source);

        assert!(outcome.succeeded());
        assert_eq!(outcome.dimensions, Some((1600, 800)));
        assert_eq!(outcome.artifacts.len(), 6);

        let order: Vec<_> = outcome
            .artifacts
            .iter()
            .map(|a| format!("{}/{}", a.profile, a.encoding))
            .collect();
        assert_eq!(
            order,
            vec!["thumb/webp", "thumb/jpg", "medium/webp", "medium/jpg", "large/webp", "large/jpg"]
        );

        for artifact in &outcome.artifacts {
            assert_eq!(
                artifact.path,
                output.join(&artifact.profile).join(format!("AN-001.{}", artifact.encoding))
            );
            assert!(artifact.path.is_file());
        }

        let thumb = image::open(output.join("thumb/AN-001.jpg")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (300, 150));
        let large = image::open(output.join("large/AN-001.jpg")).unwrap();
        assert_eq!((large.width(), large.height()), (1200, 600));
    }

    #[test]
    fn test_generate_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();
        let output = prepared_output(&temp_dir, &catalog);
        let source = SourceImage::from_path(&write_png(temp_dir.path(), "ring.png", 900, 900)).unwrap();
        let generator = DerivativeGenerator::new(NativeCodec::new(), &output, catalog);

        let first = generator.generate(&source);
        let second = generator.generate(&source);

        let first_paths: Vec<_> = first.artifacts.iter().map(|a| a.path.clone()).collect();
        let second_paths: Vec<_> = second.artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(first_paths, second_paths);
        assert_eq!(count_files(&output), 6);
    }

    #[test]
    fn test_small_source_is_never_upscaled() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();
        let output = prepared_output(&temp_dir, &catalog);
        let source = SourceImage::from_path(&write_png(temp_dir.path(), "tiny.png", 120, 80)).unwrap();

        let outcome = DerivativeGenerator::new(NativeCodec::new(), &output, catalog).generate(&source);
        assert!(outcome.succeeded());

        for name in ["thumb", "medium", "large"] {
            let jpg = image::open(output.join(name).join("tiny.jpg")).unwrap();
            assert_eq!((jpg.width(), jpg.height()), (120, 80));
        }
    }

    #[test]
    fn test_corrupt_source_fails_without_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();
        let output = prepared_output(&temp_dir, &catalog);
        let path = temp_dir.path().join("corrupt.png");
        std::fs::write(&path, b"\x89PNG garbage").unwrap();
        let source = SourceImage::from_path(&path).unwrap();

        let outcome = DerivativeGenerator::new(NativeCodec::new(), &output, catalog).generate(&source);

        assert!(!outcome.succeeded());
        assert!(matches!(outcome.failure, Some(GenerateError::Decode { .. })));
        assert!(outcome.artifacts.is_empty());
        assert_eq!(count_files(&output), 0);
    }

    #[test]
    fn test_encode_failure_keeps_partial_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::default();
        let output = prepared_output(&temp_dir, &catalog);
        let source = SourceImage::from_path(&write_png(temp_dir.path(), "p.png", 400, 400)).unwrap();

        let codec = FlakyCodec {
            inner: NativeCodec::new(),
            fail_at: 3,
            calls: AtomicUsize::new(0),
        };
        let outcome = DerivativeGenerator::new(codec, &output, catalog).generate(&source);

        assert!(!outcome.succeeded());
        match outcome.failure {
            Some(GenerateError::Encode { ref profile, ref encoding, .. }) => {
                assert_eq!(profile, "medium");
                assert_eq!(encoding, "webp");
            }
            ref other => panic!("unexpected failure: {:?}", other),
        }
        assert_eq!(outcome.artifacts.len(), 2);
        assert!(output.join("thumb/p.webp").is_file());
        assert!(output.join("thumb/p.jpg").is_file());
        assert!(!output.join("medium/p.webp").exists());
    }

    #[test]
    fn test_missing_profile_dir_is_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = ProfileCatalog::new(vec![OutputProfile::new("hero", 64, 64, 80)]).unwrap();
        let source = SourceImage::from_path(&write_png(temp_dir.path(), "h.png", 32, 32)).unwrap();

        let output = temp_dir.path().join("never-created");
        let outcome = DerivativeGenerator::new(NativeCodec::new(), &output, catalog).generate(&source);

        assert!(matches!(outcome.failure, Some(GenerateError::Write { .. })));
    }

    #[test]
    fn test_source_image_attributes() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "AN-042.png", 10, 10);
        let source = SourceImage::from_path(&path).unwrap();

        assert_eq!(source.stem(), "AN-042");
        assert_eq!(source.path(), path.as_path());
        assert!(source.size_bytes() > 0);
    }
}
