//! # Image Processing Module
//!
//! Ricodifica di una singola immagine a qualità ridotta.
//!
//! ## Pipeline per file:
//! 1. Calcolo del nome di destinazione (`nome` + postfix + `estensione`)
//! 2. Dimensione originale
//! 3. Decode + encode su thread separato, con `execution_timeout`
//! 4. Scrittura su file temporaneo nascosto nella stessa directory
//! 5. Spostamento atomico sul nome finale (mai sovrascrivendo)
//! 6. Dimensione compressa, rimozione dell'originale
//!
//! ## Garanzie:
//! - L'originale viene rimosso solo dopo che il file compresso è al suo posto
//! - Un encode abbandonato per timeout non lascia mai un file `_compressed` parziale:
//!   il temporaneo viene eliminato dal thread stesso quando termina

use crate::deadline::{run_blocking_io, run_detached, Deadline};
use crate::error::TransformError;
use crate::file_manager::FileManager;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

/// Black-box encoder: reads `source` and returns it re-encoded at `quality`
pub trait ImageCodec: Send + Sync + 'static {
    fn encode(&self, source: &Path, quality: u8) -> Result<Vec<u8>, TransformError>;
}

/// Codec backed by the `image` crate (JPEG and PNG)
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn encode(&self, source: &Path, quality: u8) -> Result<Vec<u8>, TransformError> {
        let format = ImageFormat::from_path(source)?;
        let img = image::open(source)?;
        let mut buffer = Vec::new();

        match format {
            ImageFormat::Jpeg => {
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                encoder.encode_image(&rgb)?;
            }
            ImageFormat::Png => {
                // PNG is lossless: quality only buys the strongest deflate settings
                let encoder =
                    PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
                encoder.write_image(img.as_bytes(), img.width(), img.height(), img.color())?;
            }
            other => {
                return Err(TransformError::UnsupportedFormat(format!(
                    "{:?} ({})",
                    other,
                    source.display()
                )))
            }
        }

        Ok(buffer)
    }
}

/// Result of compressing one file
#[derive(Debug)]
pub enum TransformOutcome {
    /// Megabytes saved (may be negative) and the new file
    Compressed { saved_mb: f64, target: PathBuf },
    Failed(TransformError),
}

/// Re-encodes single images in place, bounded by the execution timeout
#[derive(Clone)]
pub struct ImageTransform {
    codec: Arc<dyn ImageCodec>,
    postfix: String,
    quality: u8,
    execution_timeout: Duration,
    /// Bound for each metadata, move and delete call on the storage
    io_timeout: Duration,
}

impl ImageTransform {
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        postfix: &str,
        quality: u8,
        execution_timeout: Duration,
        io_timeout: Duration,
    ) -> Self {
        Self {
            codec,
            postfix: postfix.to_string(),
            quality,
            execution_timeout,
            io_timeout,
        }
    }

    /// Compress `file_path` (named `filename` inside `dir_path`) next to itself.
    ///
    /// Never panics and never leaves the image without a copy on disk: on any
    /// failure the original stays where it was.
    pub async fn compress(
        &self,
        dir_path: &Path,
        file_path: &Path,
        filename: &str,
        extension_index: usize,
    ) -> TransformOutcome {
        let new_filename = FileManager::compressed_name(filename, extension_index, &self.postfix);
        let target = dir_path.join(new_filename);
        let started = Instant::now();

        match self.try_compress(dir_path, file_path, filename, &target).await {
            Ok(saved_mb) => {
                info!(
                    ">>> {} was compressed in {:.2} seconds.",
                    filename,
                    started.elapsed().as_secs_f64()
                );
                TransformOutcome::Compressed { saved_mb, target }
            }
            Err(e) => {
                error!(">>> \"{}\" could not be compressed. Error: {}", file_path.display(), e);
                TransformOutcome::Failed(e)
            }
        }
    }

    async fn try_compress(
        &self,
        dir_path: &Path,
        file_path: &Path,
        filename: &str,
        target: &Path,
    ) -> Result<f64, TransformError> {
        let original_mb = FileManager::convert_size(self.file_len("stat", file_path).await?);
        info!("In the process of compression: {} [{}MB]", filename, original_mb);

        let codec = self.codec.clone();
        let source = file_path.to_path_buf();
        let dir = dir_path.to_path_buf();
        let quality = self.quality;

        let staged = run_detached("encode", self.execution_timeout, move || {
            encode_to_temp(codec.as_ref(), &source, &dir, quality)
        })
        .await?;

        let temp = match staged {
            Deadline::Completed(result) => result?,
            Deadline::TimedOut => return Err(TransformError::TimedOut(self.execution_timeout)),
        };

        let destination = target.to_path_buf();
        run_blocking_io("persist", self.io_timeout, move || {
            temp.persist_noclobber(&destination).map(|_| ()).map_err(|e| e.error)
        })
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                TransformError::TargetExists(target.to_path_buf())
            } else {
                TransformError::Io(e)
            }
        })?;
        let compressed_len = self.file_len("stat", target).await?;
        debug!(
            "Compressed file in place: {} ({})",
            target.display(),
            FileManager::format_size(compressed_len)
        );

        let compressed_mb = FileManager::convert_size(compressed_len);
        let source = file_path.to_path_buf();
        run_blocking_io("remove", self.io_timeout, move || std::fs::remove_file(&source)).await?;

        Ok(FileManager::round2(original_mb - compressed_mb))
    }

    async fn file_len(&self, name: &str, path: &Path) -> std::io::Result<u64> {
        let path = path.to_path_buf();
        run_blocking_io(name, self.io_timeout, move || std::fs::metadata(&path).map(|m| m.len())).await
    }
}

/// Encode and stage the result in a hidden temporary file next to the source.
/// The temporary name never matches an image extension, so a crash leaves
/// nothing a later run would pick up.
fn encode_to_temp(
    codec: &dyn ImageCodec,
    source: &Path,
    dir: &Path,
    quality: u8,
) -> Result<NamedTempFile, TransformError> {
    let bytes = codec.encode(source, quality)?;
    let permissions = std::fs::metadata(source)?.permissions();

    let mut temp = tempfile::Builder::new()
        .prefix(".compress-")
        .suffix(".partial")
        .tempfile_in(dir)?;
    temp.write_all(&bytes)?;
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    /// Noisy image so that the re-encode has something to shrink
    pub(crate) fn write_test_image(path: &Path, size: u32) {
        let img = RgbImage::from_fn(size, size, |x, y| {
            let v = ((x * 7919 + y * 104729) % 251) as u8;
            Rgb([v, v.wrapping_mul(3), v.wrapping_add(x as u8)])
        });
        img.save(path).unwrap();
    }

    pub(crate) struct FailingCodec;

    impl ImageCodec for FailingCodec {
        fn encode(&self, _source: &Path, _quality: u8) -> Result<Vec<u8>, TransformError> {
            Err(TransformError::Codec("corrupt image".to_string()))
        }
    }

    pub(crate) struct SlowCodec {
        pub delay: Duration,
    }

    impl ImageCodec for SlowCodec {
        fn encode(&self, _source: &Path, _quality: u8) -> Result<Vec<u8>, TransformError> {
            std::thread::sleep(self.delay);
            Ok(vec![0u8; 64])
        }
    }

    /// Stands in for a decoder that crashes on malformed input
    struct PanickingCodec;

    impl ImageCodec for PanickingCodec {
        fn encode(&self, source: &Path, _quality: u8) -> Result<Vec<u8>, TransformError> {
            panic!("decoder crashed on {}", source.display());
        }
    }

    fn transform(codec: Arc<dyn ImageCodec>, timeout: Duration) -> ImageTransform {
        ImageTransform::new(codec, "_compressed", 20, timeout, Duration::from_secs(5))
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_jpeg_is_compressed_and_original_removed() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.jpg");
        write_test_image(&source, 64);

        let outcome = transform(Arc::new(ImageCrateCodec), Duration::from_secs(30))
            .compress(temp_dir.path(), &source, "a.jpg", 1)
            .await;

        match outcome {
            TransformOutcome::Compressed { target, .. } => {
                assert_eq!(target, temp_dir.path().join("a_compressed.jpg"));
                assert!(image::open(&target).is_ok());
            }
            TransformOutcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
        assert_eq!(dir_names(temp_dir.path()), vec!["a_compressed.jpg"]);
    }

    #[tokio::test]
    async fn test_png_is_reencoded() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("shot.PNG");
        write_test_image(&temp_dir.path().join("shot.png"), 32);
        std::fs::rename(temp_dir.path().join("shot.png"), &source).unwrap();

        let outcome = transform(Arc::new(ImageCrateCodec), Duration::from_secs(30))
            .compress(temp_dir.path(), &source, "shot.PNG", 4)
            .await;

        assert!(matches!(outcome, TransformOutcome::Compressed { .. }));
        assert_eq!(dir_names(temp_dir.path()), vec!["shot_compressed.PNG"]);
    }

    #[tokio::test]
    async fn test_corrupt_image_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("bad.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let outcome = transform(Arc::new(ImageCrateCodec), Duration::from_secs(30))
            .compress(temp_dir.path(), &source, "bad.jpg", 3)
            .await;

        assert!(matches!(outcome, TransformOutcome::Failed(TransformError::Image(_))));
        assert_eq!(dir_names(temp_dir.path()), vec!["bad.jpg"]);
    }

    #[tokio::test]
    async fn test_codec_error_is_failed() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("x.png");
        std::fs::write(&source, b"bytes").unwrap();

        let outcome = transform(Arc::new(FailingCodec), Duration::from_secs(5))
            .compress(temp_dir.path(), &source, "x.png", 1)
            .await;

        assert!(matches!(outcome, TransformOutcome::Failed(TransformError::Codec(_))));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_timeout_keeps_original_and_leaves_no_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("slow.jpg");
        std::fs::write(&source, b"original bytes").unwrap();

        let outcome = transform(Arc::new(SlowCodec { delay: Duration::from_millis(400) }), Duration::from_millis(50))
            .compress(temp_dir.path(), &source, "slow.jpg", 4)
            .await;

        match outcome {
            TransformOutcome::Failed(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }

        // Let the abandoned encoder finish and clean up after itself
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(dir_names(temp_dir.path()), vec!["slow.jpg"]);
        assert_eq!(std::fs::read(&source).unwrap(), b"original bytes");
    }

    #[tokio::test]
    async fn test_existing_target_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.jpg");
        write_test_image(&source, 16);
        std::fs::write(temp_dir.path().join("a_compressed.jpg"), b"earlier result").unwrap();

        let outcome = transform(Arc::new(ImageCrateCodec), Duration::from_secs(30))
            .compress(temp_dir.path(), &source, "a.jpg", 1)
            .await;

        assert!(matches!(outcome, TransformOutcome::Failed(TransformError::TargetExists(_))));
        assert!(source.exists());
        assert_eq!(
            std::fs::read(temp_dir.path().join("a_compressed.jpg")).unwrap(),
            b"earlier result"
        );
        assert_eq!(dir_names(temp_dir.path()), vec!["a.jpg", "a_compressed.jpg"]);
    }

    #[tokio::test]
    async fn test_crashing_codec_fails_only_that_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("crash.jpg");
        std::fs::write(&source, b"bytes that crash the decoder").unwrap();

        let outcome = transform(Arc::new(PanickingCodec), Duration::from_secs(5))
            .compress(temp_dir.path(), &source, "crash.jpg", 5)
            .await;

        match outcome {
            TransformOutcome::Failed(TransformError::Io(_)) => {}
            other => panic!("expected an io failure, got {:?}", other),
        }
        assert_eq!(dir_names(temp_dir.path()), vec!["crash.jpg"]);
    }

    #[tokio::test]
    async fn test_tiny_files_report_zero_savings() {
        // Known quirk: both sizes are under 105 bytes, so the delta floors to 0.
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("tiny.png");
        std::fs::write(&source, b"tiny").unwrap();

        let outcome = transform(Arc::new(SlowCodec { delay: Duration::ZERO }), Duration::from_secs(5))
            .compress(temp_dir.path(), &source, "tiny.png", 4)
            .await;

        match outcome {
            TransformOutcome::Compressed { saved_mb, .. } => assert_eq!(saved_mb, 0.0),
            TransformOutcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
        assert!(!source.exists());
    }
}
