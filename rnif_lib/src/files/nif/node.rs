//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Scene-graph node behaviors: child management, transforms, and tree flattening.
//!
//! All of these operate on block indices of a [`NifFile`], since blocks only know
//! each other through the block list.

use nalgebra::Matrix4;

use crate::error::{Result, RNifError};
use crate::files::nif::NifFile;
use crate::math::Matrix44Ext;
use crate::records::Value;

/// Class whose subclasses can hang from a node's child list.
const AV_OBJECT_CLASS: &str = "NiAVObject";

/// Class of the nodes the tree flattener re-parents.
const NODE_CLASS: &str = "NiNode";

//---------------------------------------------------------------------------//
//                              Implementations
//---------------------------------------------------------------------------//

impl NifFile {

    /// This function returns the children of a node, in child-list order.
    pub fn children(&self, parent: usize) -> Result<Vec<usize>> {
        let schema = self.schema().clone();
        Ok(self.block(parent)?
            .list(&schema, "children")?
            .iter()
            .filter_map(|value| match value {
                Value::Link(Some(child)) => Some(*child),
                _ => None,
            })
            .collect())
    }

    /// This function appends a block to a node's child list, or prepends it when
    /// `front` is set, keeping the child counter in sync.
    ///
    /// It fails if the child is not a scene object.
    pub fn add_child(&mut self, parent: usize, child: usize, front: bool) -> Result<()> {
        let schema = self.schema().clone();
        if !self.is_kind_of(child, AV_OBJECT_CLASS)? {
            return Err(RNifError::TypeMismatch(AV_OBJECT_CLASS.to_owned(), self.block(child)?.class().to_owned()));
        }

        let block = self.block_mut(parent)?;
        let children = block.list_mut(&schema, "children")?;
        if front {
            children.insert(0, Value::Link(Some(child)));
        } else {
            children.push(Value::Link(Some(child)));
        }

        let count = children.len() as i64;
        block.set_int(&schema, "numChildren", count)
    }

    /// This function removes every occurrence of a block from a node's child list,
    /// keeping the child counter in sync.
    pub fn remove_child(&mut self, parent: usize, child: usize) -> Result<()> {
        let schema = self.schema().clone();
        let block = self.block_mut(parent)?;
        let children = block.list_mut(&schema, "children")?;
        children.retain(|value| !matches!(value, Value::Link(Some(target)) if *target == child));

        let count = children.len() as i64;
        block.set_int(&schema, "numChildren", count)
    }

    /// This function returns the local transform of a scene object, as an affine matrix.
    pub fn local_transform(&self, index: usize) -> Result<Matrix4<f32>> {
        let schema = self.schema().clone();
        let block = self.block(index)?;
        let scale = block.f32(&schema, "scale")?;
        let rotation = block.matrix33(&schema, "rotation")?;
        let translation = block.vector3(&schema, "translation")?;
        Ok(Matrix4::from_scale_rotation_translation(scale, &rotation, &translation))
    }

    /// This function sets the local transform of a scene object from an affine matrix.
    ///
    /// It fails if the matrix cannot be decomposed into scale, rotation and translation.
    pub fn set_local_transform(&mut self, index: usize, transform: &Matrix4<f32>) -> Result<()> {
        let schema = self.schema().clone();
        let (scale, rotation, translation) = transform.scale_rotation_translation()?;
        let block = self.block_mut(index)?;
        block.set_f32(&schema, "scale", scale)?;
        block.set_matrix33(&schema, "rotation", &rotation)?;
        block.set_vector3(&schema, "translation", &translation)
    }

    /// This function returns the transform of a block relative to one of its
    /// ancestors, composing the local transforms along the child chain.
    pub fn transform_relative_to(&self, block: usize, ancestor: usize) -> Result<Matrix4<f32>> {
        if block == ancestor {
            return Ok(Matrix4::identity());
        }

        for child in self.children(ancestor)? {
            if child == block {
                return self.local_transform(child);
            }

            if self.is_kind_of(child, NODE_CLASS)? {
                if let Ok(inner) = self.transform_relative_to(block, child) {
                    return Ok(inner * self.local_transform(child)?);
                }
            }
        }

        Err(RNifError::SceneNotADescendant(block, ancestor))
    }

    /// This function repositions every node block in the subtree to be a direct
    /// child of the provided node, composing local transforms so each moved block
    /// keeps its world transform. For instance, call this on the parent of a
    /// skeleton root to get a flat skeleton.
    ///
    /// It fails if the subtree contains a cycle.
    pub fn flatten_tree(&mut self, root: usize) -> Result<()> {
        let mut path = vec![root];
        for child in self.children(root)? {
            if self.is_kind_of(child, NODE_CLASS)? {
                let transform = self.local_transform(child)?;
                self.flatten_into(child, root, transform, &mut path)?;
            }
        }

        Ok(())
    }

    /// Helper for [`flatten_tree`](Self::flatten_tree). `transform` is the
    /// accumulated transform of `node` relative to `root`.
    fn flatten_into(&mut self, node: usize, root: usize, transform: Matrix4<f32>, path: &mut Vec<usize>) -> Result<()> {
        if path.contains(&node) {
            return Err(RNifError::SceneCycleDetected(node));
        }
        path.push(node);

        // Flatten grandchildren nodes first, so by the time this node's children
        // move, the deeper nodes are already empty.
        for child in self.children(node)? {
            if self.is_kind_of(child, NODE_CLASS)? {
                let child_transform = self.local_transform(child)? * transform;
                self.flatten_into(child, root, child_transform, path)?;
            }
        }

        // Re-parent the children, keeping their world transform unchanged.
        for child in self.children(node)? {
            let child_transform = self.local_transform(child)? * transform;
            self.set_local_transform(child, &child_transform)?;
            self.add_child(root, child, false)?;
        }

        let schema = self.schema().clone();
        let block = self.block_mut(node)?;
        block.list_mut(&schema, "children")?.clear();
        block.set_int(&schema, "numChildren", 0)?;

        path.pop();
        Ok(())
    }
}
