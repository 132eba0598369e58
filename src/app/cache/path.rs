//! Resource keys and on-disk layout
//!
//! Every resource lives in its own directory under the cache root, named after
//! the MD5 digest of its URL:
//!
//! ```text
//! {cache_root}/{md5(url)}/data.bin
//! {cache_root}/{md5(url)}/descriptor.json
//! {cache_root}/{md5(url)}/ranges.json
//! ```

use std::path::{Path, PathBuf};

use crate::constants::files;

/// Path generation utility for cache files
pub struct PathGenerator;

impl PathGenerator {
    /// Stable directory name for a resource identifier
    pub fn resource_key(resource_id: &str) -> String {
        format!("{:x}", md5::compute(resource_id.as_bytes()))
    }

    /// Directory holding every file of one resource
    pub fn resource_dir(cache_root: &Path, resource_id: &str) -> PathBuf {
        cache_root.join(Self::resource_key(resource_id))
    }

    pub fn data_path(resource_dir: &Path) -> PathBuf {
        resource_dir.join(files::DATA_FILE_NAME)
    }

    pub fn descriptor_path(resource_dir: &Path) -> PathBuf {
        resource_dir.join(files::DESCRIPTOR_FILE_NAME)
    }

    pub fn range_index_path(resource_dir: &Path) -> PathBuf {
        resource_dir.join(files::RANGE_INDEX_FILE_NAME)
    }

    /// Sibling temp path used while a file is written atomically
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(files::TEMP_FILE_SUFFIX);
        path.with_file_name(name)
    }
}

/// All file locations of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub dir: PathBuf,
    pub data: PathBuf,
    pub descriptor: PathBuf,
    pub range_index: PathBuf,
}

impl ResourcePaths {
    pub fn new(cache_root: &Path, resource_id: &str) -> Self {
        let dir = PathGenerator::resource_dir(cache_root, resource_id);
        Self {
            data: PathGenerator::data_path(&dir),
            descriptor: PathGenerator::descriptor_path(&dir),
            range_index: PathGenerator::range_index_path(&dir),
            dir,
        }
    }
}
