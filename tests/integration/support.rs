//! Fixture helpers shared by the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};

/// Write `content` to `dir/rel`, creating parent directories.
pub fn write_file(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Sorted relative paths of every regular file under `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    files
}

/// 8x8 grid of pseudo-random gray levels derived from `seed`.
fn block_pattern(seed: u64) -> [u8; 64] {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut blocks = [0u8; 64];
    for block in &mut blocks {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        *block = (state >> 56) as u8;
    }
    blocks
}

/// Render the block pattern for `seed` as a `size`x`size` image and save
/// it; the format follows the extension. The same seed at different sizes
/// gives near-duplicate images, different seeds give unrelated ones.
pub fn write_pattern_image(dir: &Path, rel: &str, seed: u64, size: u32) -> PathBuf {
    let blocks = block_pattern(seed);
    let img = GrayImage::from_fn(size, size, |x, y| {
        let bx = (x * 8 / size) as usize;
        let by = (y * 8 / size) as usize;
        Luma([blocks[by * 8 + bx]])
    });
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    img.save(&path).unwrap();
    path
}
