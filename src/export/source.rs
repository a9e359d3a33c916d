use std::{collections::HashMap, path::PathBuf};

use anyhow::Context as _;
use rayon::prelude::*;

use crate::{
    export::decode::decode_image,
    foundation::core::Photo,
    foundation::error::{WallError, WallResult},
};

/// Resolves a photo's opaque image reference to encoded image bytes.
///
/// Implementations are shared across loader threads.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, image_ref: &str) -> WallResult<Vec<u8>>;
}

/// Image references resolved as paths below a root directory.
///
/// A leading `/` anchors at the root rather than the filesystem root; `..` is rejected.
#[derive(Clone, Debug)]
pub struct DirImageSource {
    root: PathBuf,
}

impl DirImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSource for DirImageSource {
    fn fetch(&self, image_ref: &str) -> WallResult<Vec<u8>> {
        let rel = normalize_image_ref(image_ref)?;
        let path = self.root.join(&rel);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read image '{}'", path.display()))?;
        Ok(bytes)
    }
}

/// In-memory image bytes keyed by reference.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_ref: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(image_ref.into(), bytes);
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch(&self, image_ref: &str) -> WallResult<Vec<u8>> {
        self.images.get(image_ref).cloned().ok_or_else(|| {
            WallError::image_source(format!("unknown image reference '{image_ref}'"))
        })
    }
}

/// Fetch and decode every photo's image in parallel, keeping input order.
///
/// A slot whose fetch or decode fails is `None`; the other slots are unaffected.
pub fn load_images(photos: &[Photo], source: &dyn ImageSource) -> Vec<Option<image::RgbaImage>> {
    photos
        .par_iter()
        .map(|photo| {
            let loaded = source
                .fetch(&photo.image_ref)
                .and_then(|bytes| decode_image(&bytes));
            match loaded {
                Ok(img) => Some(img),
                Err(err) => {
                    tracing::warn!(
                        key = %photo.key,
                        image_ref = %photo.image_ref,
                        error = %err,
                        "image unavailable, card exported without it"
                    );
                    None
                }
            }
        })
        .collect()
}

pub fn normalize_image_ref(image_ref: &str) -> WallResult<String> {
    let s = image_ref.replace('\\', "/");
    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(WallError::image_source("image references must not contain '..'"));
        }
        out.push(part);
    }
    if out.is_empty() {
        return Err(WallError::image_source("image reference must name a file"));
    }
    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn normalize_image_ref_cases() {
        assert_eq!(normalize_image_ref("a/b.png").unwrap(), "a/b.png");
        assert_eq!(normalize_image_ref("/api/x.png").unwrap(), "api/x.png");
        assert_eq!(normalize_image_ref("a\\.\\b.png").unwrap(), "a/b.png");
        assert!(normalize_image_ref("../secret").is_err());
        assert!(normalize_image_ref("//").is_err());
    }

    #[test]
    fn load_images_isolates_failures_and_keeps_order() {
        let mut src = MemoryImageSource::new();
        src.insert("a", png_bytes(3, 2));
        src.insert("broken", b"not an image".to_vec());
        src.insert("c", png_bytes(1, 5));

        let photos = vec![
            Photo::new("1", "a", ""),
            Photo::new("2", "missing", ""),
            Photo::new("3", "broken", ""),
            Photo::new("4", "c", ""),
        ];
        let loaded = load_images(&photos, &src);
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[0].as_ref().unwrap().dimensions(), (3, 2));
        assert!(loaded[1].is_none());
        assert!(loaded[2].is_none());
        assert_eq!(loaded[3].as_ref().unwrap().dimensions(), (1, 5));
    }

    #[test]
    fn dir_source_reads_below_root() {
        let root = std::env::temp_dir().join(format!("polawall_dir_source_{}", std::process::id()));
        std::fs::create_dir_all(root.join("img")).unwrap();
        std::fs::write(root.join("img/a.png"), png_bytes(2, 2)).unwrap();

        let src = DirImageSource::new(&root);
        assert!(src.fetch("/img/a.png").is_ok());
        assert!(src.fetch("img/none.png").is_err());

        std::fs::remove_dir_all(&root).ok();
    }
}
