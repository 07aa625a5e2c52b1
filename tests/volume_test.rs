//! Volume pair handling against real files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use cx_release::mhd::{ElementType, MetaImage, VoxelArray};
use cx_release::volume::VolumeFile;

/// Write a 3x2x1 MET_SHORT pair with non-default spatial metadata.
fn write_short_pair(dir: &Path, name: &str) -> PathBuf {
    let header = format!(
        "\
ObjectType = Image
NDims = 3
DimSize = 3 2 1
ElementSpacing = 0.5 0.5 2
Offset = 10 20 30
ElementType = MET_SHORT
ElementDataFile = {}.raw
",
        name
    );
    let values: Vec<i16> = vec![-2, -1, 0, 1, 2, 300];
    let mut raw = Vec::new();
    for v in &values {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    let header_path = dir.join(format!("{}.mhd", name));
    fs::write(&header_path, header).unwrap();
    fs::write(dir.join(format!("{}.raw", name)), raw).unwrap();
    header_path
}

#[test]
fn test_duplicate_copies_both_files_and_keeps_originals() {
    let dir = TempDir::new().unwrap();
    let header = write_short_pair(dir.path(), "patient1");
    let original_header = fs::read(&header).unwrap();
    let original_raw = fs::read(dir.path().join("patient1.raw")).unwrap();

    let volume = VolumeFile::new(&header).unwrap();
    volume.duplicate(&dir.path().join("copy.mhd")).unwrap();

    assert_eq!(fs::read(dir.path().join("copy.mhd")).unwrap(), original_header);
    assert_eq!(fs::read(dir.path().join("copy.raw")).unwrap(), original_raw);
    assert_eq!(fs::read(&header).unwrap(), original_header);
    assert_eq!(fs::read(dir.path().join("patient1.raw")).unwrap(), original_raw);
}

#[test]
fn test_save_with_conversion_preserves_spatial_metadata() {
    let dir = TempDir::new().unwrap();
    let header = write_short_pair(dir.path(), "patient1");

    let mut volume = VolumeFile::new(&header).unwrap();
    volume.load().unwrap();
    let floats = volume.as_array(ElementType::F32).unwrap();
    assert_eq!(
        floats,
        VoxelArray::F32(vec![-2.0, -1.0, 0.0, 1.0, 2.0, 300.0])
    );

    let out = dir.path().join("converted.mhd");
    volume.save_volume(&floats, &out).unwrap();

    let converted = MetaImage::read(&out).unwrap();
    assert_eq!(converted.element_type, ElementType::F32);
    assert_eq!(converted.dims, vec![3, 2, 1]);
    assert_eq!(converted.spacing, vec![0.5, 0.5, 2.0]);
    assert_eq!(converted.origin, vec![10.0, 20.0, 30.0]);
    assert_eq!(
        converted.as_array(ElementType::F32),
        VoxelArray::F32(vec![-2.0, -1.0, 0.0, 1.0, 2.0, 300.0])
    );
}

#[test]
fn test_written_pair_reads_back() {
    let dir = TempDir::new().unwrap();
    let header = write_short_pair(dir.path(), "patient1");

    let image = MetaImage::read(&header).unwrap();
    let out = dir.path().join("again.mhd");
    image.write(&out).unwrap();

    let reread = MetaImage::read(&out).unwrap();
    assert_eq!(reread.element_type, ElementType::I16);
    assert_eq!(
        reread.as_array(ElementType::I16),
        image.as_array(ElementType::I16)
    );
    assert!(dir.path().join("again.raw").is_file());
}

#[test]
fn test_compressed_payloads_are_rejected() {
    let dir = TempDir::new().unwrap();
    let header = "\
NDims = 3
DimSize = 1 1 1
ElementType = MET_UCHAR
CompressedData = True
ElementDataFile = x.raw
";
    fs::write(dir.path().join("x.mhd"), header).unwrap();
    fs::write(dir.path().join("x.raw"), [0u8]).unwrap();

    let err = MetaImage::read(&dir.path().join("x.mhd")).unwrap_err();
    assert!(err.to_string().contains("compressed"));
}
