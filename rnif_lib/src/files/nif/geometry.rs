//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Triangle-based geometry behaviors: mesh accessors and tangent-space generation.

use nalgebra::Vector3;

use std::io::Cursor;

use crate::binary::WriteBytes;
use crate::error::{Result, RNifError};
use crate::files::nif::NifFile;
use crate::math::EPSILON;
use crate::records::Value;

/// Name of the binary extra data payload holding the tangent space of a mesh.
pub const TANGENT_SPACE_EXTRA_NAME: &str = "Tangent space (binormal & tangent vectors)";

/// Class of the blocks holding mesh data.
const GEOMETRY_DATA_CLASS: &str = "NiGeometryData";

/// Class of the strip-compressed mesh data blocks.
const STRIPS_DATA_CLASS: &str = "NiTriStripsData";

/// Class of the extra data blocks holding raw bytes.
const BINARY_EXTRA_CLASS: &str = "NiBinaryExtraData";

/// First version storing extra data as an array instead of a linked chain.
const EXTRA_LIST_VERSION: u32 = 0x0A00_0100;

/// Bytes of tangent-space data per vertex: one tangent and one binormal, three floats each.
pub const TANGENT_SPACE_BYTES_PER_VERTEX: usize = 24;

//---------------------------------------------------------------------------//
//                              Implementations
//---------------------------------------------------------------------------//

impl NifFile {

    /// This function returns the mesh data block of a geometry block.
    pub fn geometry_data(&self, geom: usize) -> Result<usize> {
        let schema = self.schema().clone();
        let data = self.block(geom)?.link(&schema, "data")?.ok_or(RNifError::GeometryMissingData(geom))?;
        if !self.is_kind_of(data, GEOMETRY_DATA_CLASS)? {
            return Err(RNifError::GeometryMissingData(geom));
        }

        Ok(data)
    }

    /// This function returns the amount of vertices of a geometry block.
    pub fn vertex_count(&self, geom: usize) -> Result<usize> {
        let schema = self.schema().clone();
        Ok(self.block(self.geometry_data(geom)?)?.int(&schema, "numVertices")? as usize)
    }

    /// This function returns the vertex positions of a geometry block.
    pub fn vertices(&self, geom: usize) -> Result<Vec<Vector3<f32>>> {
        self.vector3_list(self.geometry_data(geom)?, "vertices")
    }

    /// This function returns the vertex normals of a geometry block.
    pub fn normals(&self, geom: usize) -> Result<Vec<Vector3<f32>>> {
        self.vector3_list(self.geometry_data(geom)?, "normals")
    }

    /// This function returns one UV set of a geometry block, as `(u, v)` pairs.
    pub fn uv_set(&self, geom: usize, set: usize) -> Result<Vec<(f32, f32)>> {
        let schema = self.schema().clone();
        let data = self.geometry_data(geom)?;
        let sets = self.block(data)?.list(&schema, "uvSets")?;
        let Some(Value::List(coords)) = sets.get(set) else {
            return Err(RNifError::GeometryMissingData(geom));
        };

        let mut result = Vec::with_capacity(coords.len());
        for coord in coords {
            let Value::Struct(coord) = coord else {
                return Err(RNifError::GeometryMissingData(geom));
            };

            result.push((coord.f32(&schema, "u")?, coord.f32(&schema, "v")?));
        }

        Ok(result)
    }

    /// This function returns the triangle list of a geometry block, rebuilding it
    /// from the triangle strips when the mesh data is strip-compressed.
    ///
    /// Degenerate strip triangles (with a repeated corner) are dropped, as they
    /// only exist to stitch strips together.
    pub fn triangles(&self, geom: usize) -> Result<Vec<[usize; 3]>> {
        let schema = self.schema().clone();
        let data = self.geometry_data(geom)?;
        let block = self.block(data)?;

        let mut triangles = vec![];
        if self.is_kind_of(data, STRIPS_DATA_CLASS)? {
            for strip in block.list(&schema, "points")? {
                let Value::List(points) = strip else {
                    return Err(RNifError::GeometryMissingData(geom));
                };

                let points = points.iter().filter_map(Value::as_int).map(|point| point as usize).collect::<Vec<_>>();
                for window in 0..points.len().saturating_sub(2) {
                    let (v1, v2, v3) = (points[window], points[window + 1], points[window + 2]);
                    if v1 == v2 || v2 == v3 || v1 == v3 {
                        continue;
                    }

                    // Strips alternate winding on every triangle.
                    if window % 2 == 0 {
                        triangles.push([v1, v2, v3]);
                    } else {
                        triangles.push([v1, v3, v2]);
                    }
                }
            }
        } else {
            for triangle in block.list(&schema, "triangles")? {
                let Value::Struct(triangle) = triangle else {
                    return Err(RNifError::GeometryMissingData(geom));
                };

                triangles.push([
                    triangle.int(&schema, "v1")? as usize,
                    triangle.int(&schema, "v2")? as usize,
                    triangle.int(&schema, "v3")? as usize,
                ]);
            }
        }

        Ok(triangles)
    }

    /// This function returns the extra data blocks of a block, both from the extra
    /// data array of late versions and from the linked chain of early ones.
    pub fn extra_data_blocks(&self, index: usize) -> Result<Vec<usize>> {
        let schema = self.schema().clone();
        let block = self.block(index)?;

        let mut result = block.list(&schema, "extraDataList")?
            .iter()
            .filter_map(|value| match value {
                Value::Link(Some(extra)) => Some(*extra),
                _ => None,
            })
            .collect::<Vec<_>>();

        // The chain can only loop on corrupt files, but a loop would hang us.
        let mut next = block.link(&schema, "extraData")?;
        while let Some(extra) = next {
            if result.contains(&extra) {
                break;
            }

            result.push(extra);
            next = self.block(extra)?.link(&schema, "nextExtraData")?;
        }

        Ok(result)
    }

    /// This function returns the block holding the tangent-space payload of a
    /// geometry block, if it has one.
    pub fn tangent_space_extra(&self, geom: usize) -> Result<Option<usize>> {
        let schema = self.schema().clone();
        for extra in self.extra_data_blocks(geom)? {
            if self.is_kind_of(extra, BINARY_EXTRA_CLASS)?
                && self.block(extra)?.string(&schema, "name")? == TANGENT_SPACE_EXTRA_NAME {
                return Ok(Some(extra));
            }
        }

        Ok(None)
    }

    /// This function returns the raw tangent-space payload of a geometry block.
    pub fn tangent_space_payload(&self, geom: usize) -> Result<Option<Vec<u8>>> {
        let schema = self.schema().clone();
        let Some(extra) = self.tangent_space_extra(geom)? else {
            return Ok(None);
        };

        let Value::Struct(binary) = self.block(extra)?.value(&schema, "binaryData")? else {
            return Err(RNifError::GeometryMissingData(geom));
        };

        let bytes = binary.list(&schema, "data")?
            .iter()
            .filter_map(Value::as_int)
            .map(|byte| byte as u8)
            .collect();
        Ok(Some(bytes))
    }

    /// This function recomputes the tangent space of a geometry block and stores it
    /// as binary extra data, creating and linking the extra data block if needed.
    ///
    /// Per vertex it accumulates the tangent and binormal of every triangle sharing
    /// it, aligned with the UV gradient, and orthonormalizes the sum against the
    /// vertex normal. Degenerate triangles (zero area or collinear UVs) contribute
    /// nothing. The payload is all the tangents followed by all the binormals.
    pub fn update_tangent_space(&mut self, geom: usize) -> Result<()> {
        let schema = self.schema().clone();
        let vertices = self.vertices(geom)?;
        let normals = self.normals(geom)?;
        let uvs = self.uv_set(geom, 0)?;
        let triangles = self.triangles(geom)?;
        let count = vertices.len();

        if normals.len() != count || uvs.len() != count {
            return Err(RNifError::GeometryMissingData(geom));
        }

        let mut tangents = vec![Vector3::zeros(); count];
        let mut binormals = vec![Vector3::zeros(); count];

        for [i1, i2, i3] in triangles {
            if i1 >= count || i2 >= count || i3 >= count {
                return Err(RNifError::GeometryMissingData(geom));
            }

            let d1 = vertices[i2] - vertices[i1];
            let d2 = vertices[i3] - vertices[i1];
            let (s1, t1) = (uvs[i2].0 - uvs[i1].0, uvs[i2].1 - uvs[i1].1);
            let (s2, t2) = (uvs[i3].0 - uvs[i1].0, uvs[i3].1 - uvs[i1].1);

            // Zero area or collinear UVs make the gradient meaningless.
            let area = d1.cross(&d2).norm();
            let uv_area = s1 * t2 - s2 * t1;
            if area < EPSILON || uv_area.abs() < EPSILON {
                continue;
            }

            let tangent = (d1 * t2 - d2 * t1) / uv_area;
            let binormal = (d2 * s1 - d1 * s2) / uv_area;

            for index in [i1, i2, i3] {
                tangents[index] += tangent;
                binormals[index] += binormal;
            }
        }

        let mut payload = Cursor::new(Vec::with_capacity(count * TANGENT_SPACE_BYTES_PER_VERTEX));
        let mut ortho_binormals = Vec::with_capacity(count);
        for index in 0..count {
            let normal = normals[index];

            let mut tangent = tangents[index] - normal * normal.dot(&tangents[index]);
            if tangent.norm() > EPSILON {
                tangent.normalize_mut();
            } else {
                tangent = Vector3::zeros();
            }

            let mut binormal = binormals[index] - normal * normal.dot(&binormals[index]) - tangent * tangent.dot(&binormals[index]);
            if binormal.norm() > EPSILON {
                binormal.normalize_mut();
            } else {
                binormal = Vector3::zeros();
            }

            payload.write_f32(tangent.x)?;
            payload.write_f32(tangent.y)?;
            payload.write_f32(tangent.z)?;
            ortho_binormals.push(binormal);
        }

        for binormal in ortho_binormals {
            payload.write_f32(binormal.x)?;
            payload.write_f32(binormal.y)?;
            payload.write_f32(binormal.z)?;
        }

        self.set_tangent_space_payload(geom, &payload.into_inner())
    }

    /// This function stores a raw tangent-space payload on a geometry block,
    /// creating and linking the extra data block if needed.
    pub(crate) fn set_tangent_space_payload(&mut self, geom: usize, payload: &[u8]) -> Result<()> {
        let schema = self.schema().clone();
        let extra = match self.tangent_space_extra(geom)? {
            Some(extra) => extra,
            None => {
                let extra = self.new_block(BINARY_EXTRA_CLASS)?;
                self.block_mut(extra)?.set_string(&schema, "name", TANGENT_SPACE_EXTRA_NAME)?;

                if self.version() >= EXTRA_LIST_VERSION {
                    let block = self.block_mut(geom)?;
                    block.list_mut(&schema, "extraDataList")?.push(Value::Link(Some(extra)));
                    let count = block.list(&schema, "extraDataList")?.len() as i64;
                    block.set_int(&schema, "numExtraDataList", count)?;
                } else {

                    // Old versions chain extra data blocks. Insert at the head.
                    let head = self.block(geom)?.link(&schema, "extraData")?;
                    self.block_mut(extra)?.set_link(&schema, "nextExtraData", head)?;
                    self.block_mut(geom)?.set_link(&schema, "extraData", Some(extra))?;
                }

                extra
            }
        };

        let block = self.block_mut(extra)?;
        let Value::Struct(binary) = block.value_mut(&schema, "binaryData")? else {
            return Err(RNifError::GeometryMissingData(geom));
        };

        binary.set_int(&schema, "dataSize", payload.len() as i64)?;
        *binary.list_mut(&schema, "data")? = payload.iter().map(|byte| Value::U8(*byte)).collect();
        Ok(())
    }

    /// Helper reading a list of 3-component vectors from a block field.
    fn vector3_list(&self, index: usize, ident: &str) -> Result<Vec<Vector3<f32>>> {
        let schema = self.schema().clone();
        let values = self.block(index)?.list(&schema, ident)?;
        let mut result = Vec::with_capacity(values.len());
        for value in values {
            let Value::Struct(vector) = value else {
                return Err(RNifError::GeometryMissingData(index));
            };

            result.push(vector.as_vector3(&schema)?);
        }

        Ok(result)
    }
}
