//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Cross-checks of stored derived data against recomputed values.
//!
//! These utilities only report: they never fail a read and never leave the file
//! modified. Tool chains differ on tangent-space generation, so the comparison
//! against recomputed values uses a deliberately loose tolerance.

use log::warn;
use nalgebra::Vector3;
use rayon::prelude::*;

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::binary::ReadBytes;
use crate::error::{Result, RNifError};
use crate::files::nif::geometry::TANGENT_SPACE_BYTES_PER_VERTEX;
use crate::files::nif::NifFile;
use crate::files::{walk, WalkedFile};
use crate::math::EPSILON;
use crate::schema::Schema;

/// Class of the geometry blocks the tangent-space checks apply to.
const TRI_GEOMETRY_CLASS: &str = "NiTriBasedGeom";

/// Per-component tolerance against recomputed tangent spaces. Loose on purpose.
const RECOMPUTE_TOLERANCE: f32 = 0.3;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// One diagnostic found while checking the tangent space of a geometry block.
#[derive(Clone, Debug, PartialEq)]
pub enum TangentSpaceWarning {

    /// A normal is not of unit length.
    NonUnitNormal(usize, f32),

    /// A stored tangent is not of unit length.
    NonUnitTangent(usize, f32),

    /// A stored binormal is not of unit length.
    NonUnitBinormal(usize, f32),

    /// The stored frame is not orthogonal to the normal.
    NonOrthogonal(usize),

    /// The stored frame differs from the recomputed one beyond the loose tolerance.
    RecomputeMismatch(usize),
}

impl fmt::Display for TangentSpaceWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NonUnitNormal(vertex, norm) => write!(f, "non-unit normal (norm {norm}) at vertex {vertex}"),
            Self::NonUnitTangent(vertex, norm) => write!(f, "non-unit tangent (norm {norm}) at vertex {vertex}"),
            Self::NonUnitBinormal(vertex, norm) => write!(f, "non-unit binormal (norm {norm}) at vertex {vertex}"),
            Self::NonOrthogonal(vertex) => write!(f, "non-orthogonal tangent space at vertex {vertex}"),
            Self::RecomputeMismatch(vertex) => write!(f, "calculated tangent space differs from original at vertex {vertex}"),
        }
    }
}

//---------------------------------------------------------------------------//
//                              Implementations
//---------------------------------------------------------------------------//

impl NifFile {

    /// This function checks the stored tangent space of a geometry block: payload
    /// size, unit lengths, orthogonality, and agreement with a recomputed tangent
    /// space. The stored payload is left untouched.
    ///
    /// It fails fast if the payload size doesn't match the vertex count, before
    /// reading a single component.
    pub fn check_tangent_space(&mut self, geom: usize) -> Result<Vec<TangentSpaceWarning>> {
        let payload = self.tangent_space_payload(geom)?.ok_or(RNifError::GeometryMissingData(geom))?;
        let count = self.vertex_count(geom)?;

        let expected = count * TANGENT_SPACE_BYTES_PER_VERTEX;
        if payload.len() != expected {
            return Err(RNifError::VerifyTangentSpaceSize(expected, payload.len()));
        }

        let (tangents, binormals) = split_payload(&payload, count)?;
        let normals = self.normals(geom)?;
        let mut warnings = vec![];

        for vertex in 0..count {
            let normal = normals.get(vertex).copied().unwrap_or_else(Vector3::zeros);
            let tangent = tangents[vertex];
            let binormal = binormals[vertex];

            if (normal.norm_squared() - 1.0).abs() > EPSILON {
                warnings.push(TangentSpaceWarning::NonUnitNormal(vertex, normal.norm()));
            }

            if (tangent.norm_squared() - 1.0).abs() > EPSILON {
                warnings.push(TangentSpaceWarning::NonUnitTangent(vertex, tangent.norm()));
            }

            if (binormal.norm_squared() - 1.0).abs() > EPSILON {
                warnings.push(TangentSpaceWarning::NonUnitBinormal(vertex, binormal.norm()));
            }

            if normal.dot(&tangent).abs() + normal.dot(&binormal).abs() > EPSILON {
                warnings.push(TangentSpaceWarning::NonOrthogonal(vertex));
            }
        }

        // Recompute and compare, then put the original payload back.
        self.update_tangent_space(geom)?;
        let recomputed = self.tangent_space_payload(geom)?.ok_or(RNifError::GeometryMissingData(geom))?;
        self.set_tangent_space_payload(geom, &payload)?;

        let (new_tangents, new_binormals) = split_payload(&recomputed, count)?;
        for vertex in 0..count {
            let old = [tangents[vertex], binormals[vertex]];
            let new = [new_tangents[vertex], new_binormals[vertex]];
            let deviates = old.iter()
                .flat_map(|vector| vector.iter())
                .zip(new.iter().flat_map(|vector| vector.iter()))
                .any(|(old, new)| (old - new).abs() > RECOMPUTE_TOLERANCE);

            if deviates {
                warnings.push(TangentSpaceWarning::RecomputeMismatch(vertex));
            }
        }

        for warning in &warnings {
            warn!("block {geom}: {warning}");
        }

        Ok(warnings)
    }
}

/// This function checks the tangent space of every geometry block of every
/// supported file under the provided path, in parallel, and returns the findings
/// per file.
pub fn check_tangent_space_tree(path: &Path, schema: &Arc<Schema>) -> Result<Vec<(PathBuf, Vec<TangentSpaceWarning>)>> {
    let files = walk(path, schema)?.collect::<Vec<_>>();

    Ok(files.into_par_iter()
        .filter_map(|walked: WalkedFile| {
            let path = walked.path().to_owned();
            let mut file = walked.into_file();

            let mut warnings = vec![];
            for block in 0..file.blocks().len() {
                let is_geometry = file.is_kind_of(block, TRI_GEOMETRY_CLASS).unwrap_or(false);
                let has_payload = matches!(file.tangent_space_extra(block), Ok(Some(_)));
                if !is_geometry || !has_payload {
                    continue;
                }

                match file.check_tangent_space(block) {
                    Ok(mut block_warnings) => warnings.append(&mut block_warnings),
                    Err(error) => {
                        warn!("cannot check tangent space of block {block} in {}: {error}", path.to_string_lossy());
                        return None;
                    }
                }
            }

            Some((path, warnings))
        })
        .collect())
}

/// This function splits a tangent-space payload into its tangent and binormal halves.
fn split_payload(payload: &[u8], count: usize) -> Result<(Vec<Vector3<f32>>, Vec<Vector3<f32>>)> {
    let mut cursor = Cursor::new(payload);
    let mut vectors = Vec::with_capacity(count * 2);
    for _ in 0..count * 2 {
        let x = cursor.read_f32()?;
        let y = cursor.read_f32()?;
        let z = cursor.read_f32()?;
        vectors.push(Vector3::new(x, y, z));
    }

    let binormals = vectors.split_off(count);
    Ok((vectors, binormals))
}
