use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};
use crate::mhd::{companion_paths, ElementType, MetaImage, VoxelArray};
use crate::ui;

/// A volume image stored as a header/payload pair on disk.
///
/// Both companion files (`<base>.mhd` and `<base>.raw`) must exist together;
/// duplicating or saving one without the other is undefined. The image buffer
/// is only populated after [VolumeFile::load].
pub struct VolumeFile {
    dir: PathBuf,
    base_name: String,
    extension: String,
    image: Option<MetaImage>,
}

impl VolumeFile {
    /// Describe a volume by any path to it; the extension is stripped to find
    /// the companion pair.
    pub fn new(volume_path: &Path) -> Result<Self> {
        let dir = volume_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base_name = volume_path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ReleaseError::volume(format!("invalid volume path: {}", volume_path.display()))
            })?;
        let extension = volume_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        Ok(VolumeFile {
            dir,
            base_name,
            extension,
            image: None,
        })
    }

    pub fn header_path(&self) -> PathBuf {
        self.dir.join(format!("{}.mhd", self.base_name))
    }

    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(format!("{}.raw", self.base_name))
    }

    /// Declared extension of the path this volume was constructed from.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Copy both companion files to a new base name. Any extension on
    /// `new_path` is dropped first. The originals are left untouched.
    pub fn duplicate(&self, new_path: &Path) -> Result<()> {
        let (new_header, new_raw) = companion_paths(new_path);
        fs::copy(self.header_path(), new_header)?;
        fs::copy(self.raw_path(), new_raw)?;
        Ok(())
    }

    /// Read the pair into memory and log its spatial metadata.
    pub fn load(&mut self) -> Result<()> {
        let image = MetaImage::read(&self.header_path())?;
        ui::info(&format!("Image origin: {:?}", image.origin));
        ui::info(&format!("Image spacing: {:?}", image.spacing));
        self.image = Some(image);
        Ok(())
    }

    fn loaded(&self) -> Result<&MetaImage> {
        self.image
            .as_ref()
            .ok_or_else(|| ReleaseError::volume("volume not loaded; call load() first"))
    }

    /// Voxel data of the loaded image, cast to the requested element type.
    pub fn as_array(&self, element_type: ElementType) -> Result<VoxelArray> {
        Ok(self.loaded()?.as_array(element_type))
    }

    /// Write a new volume pair at `path` from a voxel array, copying the
    /// spatial metadata (origin, spacing, direction) from the loaded
    /// reference image. The payload file is written by the same call.
    pub fn save_volume(&self, data: &VoxelArray, path: &Path) -> Result<()> {
        let reference = self.loaded()?;
        let image = MetaImage::from_array(data, reference)?;
        let (header_path, _) = companion_paths(path);
        image.write(&header_path)
    }
}
