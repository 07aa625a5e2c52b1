//! MetaImage (`.mhd` + `.raw`) reader and writer.
//!
//! Covers the subset the imaging pipeline actually produces: uncompressed,
//! little-endian binary volumes with the payload in a companion `.raw` file.
//! Compressed data, big-endian data and headers with inline payload
//! (`ElementDataFile = LOCAL`) are rejected with typed errors.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// Voxel element types supported by the codec, by MetaIO name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    U8,
    I16,
    U16,
    F32,
    F64,
}

impl ElementType {
    pub fn from_met(name: &str) -> Result<Self> {
        match name {
            "MET_UCHAR" => Ok(ElementType::U8),
            "MET_SHORT" => Ok(ElementType::I16),
            "MET_USHORT" => Ok(ElementType::U16),
            "MET_FLOAT" => Ok(ElementType::F32),
            "MET_DOUBLE" => Ok(ElementType::F64),
            _ => Err(ReleaseError::volume(format!(
                "unsupported element type: {}",
                name
            ))),
        }
    }

    pub fn met_name(&self) -> &'static str {
        match self {
            ElementType::U8 => "MET_UCHAR",
            ElementType::I16 => "MET_SHORT",
            ElementType::U16 => "MET_USHORT",
            ElementType::F32 => "MET_FLOAT",
            ElementType::F64 => "MET_DOUBLE",
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.met_name())
    }
}

/// Dense voxel data in a concrete element type.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelArray {
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl VoxelArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            VoxelArray::U8(_) => ElementType::U8,
            VoxelArray::I16(_) => ElementType::I16,
            VoxelArray::U16(_) => ElementType::U16,
            VoxelArray::F32(_) => ElementType::F32,
            VoxelArray::F64(_) => ElementType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VoxelArray::U8(v) => v.len(),
            VoxelArray::I16(v) => v.len(),
            VoxelArray::U16(v) => v.len(),
            VoxelArray::F32(v) => v.len(),
            VoxelArray::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cast to another element type. Values out of the target range saturate.
    pub fn cast(&self, target: ElementType) -> VoxelArray {
        VoxelArray::from_f64_values(&self.to_f64_values(), target)
    }

    pub fn to_f64_values(&self) -> Vec<f64> {
        match self {
            VoxelArray::U8(v) => v.iter().map(|&x| x as f64).collect(),
            VoxelArray::I16(v) => v.iter().map(|&x| x as f64).collect(),
            VoxelArray::U16(v) => v.iter().map(|&x| x as f64).collect(),
            VoxelArray::F32(v) => v.iter().map(|&x| x as f64).collect(),
            VoxelArray::F64(v) => v.clone(),
        }
    }

    pub fn from_f64_values(values: &[f64], target: ElementType) -> VoxelArray {
        match target {
            ElementType::U8 => VoxelArray::U8(values.iter().map(|&x| x as u8).collect()),
            ElementType::I16 => VoxelArray::I16(values.iter().map(|&x| x as i16).collect()),
            ElementType::U16 => VoxelArray::U16(values.iter().map(|&x| x as u16).collect()),
            ElementType::F32 => VoxelArray::F32(values.iter().map(|&x| x as f32).collect()),
            ElementType::F64 => VoxelArray::F64(values.to_vec()),
        }
    }

    fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            VoxelArray::U8(v) => v.clone(),
            VoxelArray::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VoxelArray::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VoxelArray::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            VoxelArray::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    fn from_le_bytes(bytes: &[u8], element_type: ElementType) -> VoxelArray {
        match element_type {
            ElementType::U8 => VoxelArray::U8(bytes.to_vec()),
            ElementType::I16 => VoxelArray::I16(
                bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            ElementType::U16 => VoxelArray::U16(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            ElementType::F32 => VoxelArray::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ElementType::F64 => VoxelArray::F64(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect(),
            ),
        }
    }
}

/// An in-memory volume image: spatial metadata plus raw voxel bytes.
#[derive(Debug, Clone)]
pub struct MetaImage {
    pub dims: Vec<usize>,
    pub spacing: Vec<f64>,
    pub origin: Vec<f64>,
    /// Row-major direction cosine matrix, `ndims * ndims` entries.
    pub direction: Vec<f64>,
    pub element_type: ElementType,
    data: Vec<u8>,
}

impl MetaImage {
    /// Build an image from a voxel array plus the spatial metadata of a
    /// reference image. The array length must match the reference dimensions.
    pub fn from_array(array: &VoxelArray, reference: &MetaImage) -> Result<Self> {
        if array.len() != reference.voxel_count() {
            return Err(ReleaseError::volume(format!(
                "voxel count mismatch: array has {}, reference expects {}",
                array.len(),
                reference.voxel_count()
            )));
        }
        Ok(MetaImage {
            dims: reference.dims.clone(),
            spacing: reference.spacing.clone(),
            origin: reference.origin.clone(),
            direction: reference.direction.clone(),
            element_type: array.element_type(),
            data: array.to_le_bytes(),
        })
    }

    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Voxel data cast to the requested element type.
    pub fn as_array(&self, target: ElementType) -> VoxelArray {
        VoxelArray::from_le_bytes(&self.data, self.element_type).cast(target)
    }

    /// Read a header file and its companion payload.
    pub fn read(header_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(header_path).map_err(|e| {
            ReleaseError::volume(format!("cannot read {}: {}", header_path.display(), e))
        })?;
        let header = parse_header(&text)?;

        let dir = header_path.parent().unwrap_or_else(|| Path::new("."));
        let raw_path = dir.join(&header.data_file);
        let data = fs::read(&raw_path).map_err(|e| {
            ReleaseError::volume(format!("cannot read {}: {}", raw_path.display(), e))
        })?;

        let expected = header.dims.iter().product::<usize>() * header.element_type.byte_size();
        if data.len() != expected {
            return Err(ReleaseError::volume(format!(
                "payload size mismatch in {}: got {} bytes, expected {}",
                raw_path.display(),
                data.len(),
                expected
            )));
        }

        Ok(MetaImage {
            dims: header.dims,
            spacing: header.spacing,
            origin: header.origin,
            direction: header.direction,
            element_type: header.element_type,
            data,
        })
    }

    /// Write the header to `header_path` and the payload to the companion
    /// `.raw` next to it, both from this one call.
    pub fn write(&self, header_path: &Path) -> Result<()> {
        let raw_path = header_path.with_extension("raw");
        let raw_name = raw_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ReleaseError::volume(format!("invalid volume path: {}", header_path.display()))
            })?;

        fs::write(header_path, self.header_text(raw_name))?;
        fs::write(&raw_path, &self.data)?;
        Ok(())
    }

    fn header_text(&self, raw_name: &str) -> String {
        // ElementDataFile must stay the last key; readers stop there.
        format!(
            "ObjectType = Image\n\
             NDims = {}\n\
             BinaryData = True\n\
             BinaryDataByteOrderMSB = False\n\
             CompressedData = False\n\
             TransformMatrix = {}\n\
             Offset = {}\n\
             ElementSpacing = {}\n\
             DimSize = {}\n\
             ElementType = {}\n\
             ElementDataFile = {}\n",
            self.dims.len(),
            join_numbers(&self.direction),
            join_numbers(&self.origin),
            join_numbers(&self.spacing),
            self.dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            self.element_type,
            raw_name
        )
    }
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug)]
struct Header {
    dims: Vec<usize>,
    spacing: Vec<f64>,
    origin: Vec<f64>,
    direction: Vec<f64>,
    element_type: ElementType,
    data_file: String,
}

fn parse_header(text: &str) -> Result<Header> {
    let mut ndims: Option<usize> = None;
    let mut dims: Option<Vec<usize>> = None;
    let mut spacing: Option<Vec<f64>> = None;
    let mut origin: Option<Vec<f64>> = None;
    let mut direction: Option<Vec<f64>> = None;
    let mut element_type: Option<ElementType> = None;
    let mut data_file: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            ReleaseError::volume(format!("malformed header line: '{}'", line))
        })?;
        let key = key.trim();
        let value = value.trim();
        match key {
            "NDims" => {
                ndims = Some(value.parse().map_err(|_| {
                    ReleaseError::volume(format!("invalid NDims: '{}'", value))
                })?)
            }
            "DimSize" => dims = Some(parse_usizes(value)?),
            "ElementSpacing" => spacing = Some(parse_floats(value)?),
            "Offset" | "Origin" | "Position" => origin = Some(parse_floats(value)?),
            "TransformMatrix" | "Orientation" => direction = Some(parse_floats(value)?),
            "ElementType" => element_type = Some(ElementType::from_met(value)?),
            "ElementDataFile" => {
                if value == "LOCAL" {
                    return Err(ReleaseError::volume(
                        "inline payload (ElementDataFile = LOCAL) is not supported",
                    ));
                }
                data_file = Some(value.to_string());
            }
            "CompressedData" => {
                if value.eq_ignore_ascii_case("true") {
                    return Err(ReleaseError::volume("compressed volumes are not supported"));
                }
            }
            "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => {
                if value.eq_ignore_ascii_case("true") {
                    return Err(ReleaseError::volume("big-endian volumes are not supported"));
                }
            }
            // ObjectType, BinaryData, CenterOfRotation and friends.
            _ => {}
        }
    }

    let dims = dims.ok_or_else(|| ReleaseError::volume("header missing DimSize"))?;
    let ndims = ndims.unwrap_or(dims.len());
    if dims.len() != ndims {
        return Err(ReleaseError::volume(format!(
            "DimSize has {} entries, NDims says {}",
            dims.len(),
            ndims
        )));
    }
    let element_type =
        element_type.ok_or_else(|| ReleaseError::volume("header missing ElementType"))?;
    let data_file =
        data_file.ok_or_else(|| ReleaseError::volume("header missing ElementDataFile"))?;

    let direction = direction.unwrap_or_else(|| identity_matrix(ndims));
    if direction.len() != ndims * ndims {
        return Err(ReleaseError::volume(format!(
            "TransformMatrix has {} entries, expected {}",
            direction.len(),
            ndims * ndims
        )));
    }

    Ok(Header {
        dims,
        spacing: spacing.unwrap_or_else(|| vec![1.0; ndims]),
        origin: origin.unwrap_or_else(|| vec![0.0; ndims]),
        direction,
        element_type,
        data_file,
    })
}

fn identity_matrix(ndims: usize) -> Vec<f64> {
    let mut matrix = vec![0.0; ndims * ndims];
    for i in 0..ndims {
        matrix[i * ndims + i] = 1.0;
    }
    matrix
}

fn parse_usizes(value: &str) -> Result<Vec<usize>> {
    value
        .split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| ReleaseError::volume(format!("invalid integer: '{}'", v)))
        })
        .collect()
}

fn parse_floats(value: &str) -> Result<Vec<f64>> {
    value
        .split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| ReleaseError::volume(format!("invalid number: '{}'", v)))
        })
        .collect()
}

/// Path of the companion header/payload pair for a base path, extension
/// stripped: `/x/vol.nii -> /x/vol.mhd`, `/x/vol -> /x/vol.mhd`.
pub fn companion_paths(path: &Path) -> (PathBuf, PathBuf) {
    (path.with_extension("mhd"), path.with_extension("raw"))
}
