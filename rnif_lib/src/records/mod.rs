//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with the typed records the schema materializes.
//!
//! A [`NifStruct`] is a generic record carrying the name of its class: its shape
//! (field order, types, gates) lives in the [`Schema`], and its data lives in a flat
//! value list aligned with the flattened field list of the class. Every compound and
//! every block of a file is one of these.
//!
//! Reference fields deserve a note: on disk they're 32-bit values, in memory they're
//! indices into the block list of the containing file. While a file is being read
//! they pass through a third state, a placeholder pushed onto the link stack, which
//! the second pass of the reader resolves back into indices. See [`for_each_link`].

use nalgebra::{Matrix3, Vector3};

use std::collections::{HashMap, VecDeque};

use crate::binary::{ReadBytes, WriteBytes};
use crate::error::{Result, RNifError};
use crate::schema::{version_string, BasicCodec, ClassFlags, ClassSpec, FieldDef, FieldKind, Schema, INTERNED_STRING_VERSION, LINK_BY_INDEX_VERSION, WIDE_BOOL_VERSION};

#[cfg(test)] mod records_test;

/// Maximum length of the header line, shared with the version probe.
pub const MAX_HEADER_LINE: usize = 64;

/// Maximum length of a free-form line string, like the copyright lines of old headers.
const MAX_LINE_STRING: usize = 1024;

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// A single decoded value. The variant in use is fixed by the field's declared type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
    String(String),

    /// A reference to another block of the containing file, by block-list index.
    Link(Option<usize>),

    /// An inline compound record.
    Struct(NifStruct),

    /// An array field. Two-dimensional arrays are lists of lists.
    List(Vec<Value>),
}

/// A typed record instance: one block or compound of a file.
#[derive(Clone, Debug, PartialEq)]
pub struct NifStruct {

    /// Name of the class in the schema.
    class: String,

    /// Template argument bound at instantiation, for parametric classes.
    template: Option<String>,

    /// Values, aligned with the `all_fields` list of the class.
    values: Vec<Value>,
}

/// The type of a field once templates and enum storages have been resolved.
enum ResolvedType<'a> {
    Codec(BasicCodec),
    Struct {
        class: &'a str,
        template: Option<&'a str>,
    },
}

/// Read-side state threaded through the field decoders.
pub struct DecodeContext<'a> {

    /// Version of the file being read.
    pub version: u32,

    /// User version of the file being read.
    pub user_version: u32,

    /// Header string table, for interned strings.
    pub strings: &'a [String],

    /// Placeholders of every reference read so far, in read order.
    pub link_stack: &'a mut VecDeque<i32>,
}

/// Write-side state threaded through the field encoders.
pub struct EncodeContext<'a> {

    /// Version of the file being written.
    pub version: u32,

    /// User version of the file being written.
    pub user_version: u32,

    /// String -> index in the header string table.
    pub strings: &'a HashMap<String, i32>,

    /// Block-list index -> on-disk reference value.
    pub block_tokens: &'a HashMap<usize, i32>,
}

//---------------------------------------------------------------------------//
//                        Implementation of NifStruct
//---------------------------------------------------------------------------//

impl NifStruct {

    /// This function creates a fresh instance of the provided class, with every field
    /// holding its default value.
    pub fn new(schema: &Schema, class: &str, template: Option<&str>) -> Result<Self> {
        let spec = schema.class(class)?;
        let mut values = Vec::with_capacity(spec.all_fields.len());
        for field in &spec.all_fields {
            values.push(default_value(schema, field, template)?);
        }

        Ok(Self {
            class: class.to_owned(),
            template: template.map(ToOwned::to_owned),
            values,
        })
    }

    /// This function returns the class name of the record.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// This function returns the template argument the record was instantiated with.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// This function returns the position of a field in the value list.
    fn position(&self, schema: &Schema, ident: &str) -> Result<usize> {
        schema.class(&self.class)?
            .index
            .get(ident)
            .copied()
            .ok_or_else(|| RNifError::SchemaMissingField(self.class.to_owned(), ident.to_owned()))
    }

    /// This function returns a reference to the raw value of a field.
    pub fn value(&self, schema: &Schema, ident: &str) -> Result<&Value> {
        Ok(&self.values[self.position(schema, ident)?])
    }

    /// This function returns a mutable reference to the raw value of a field.
    pub fn value_mut(&mut self, schema: &Schema, ident: &str) -> Result<&mut Value> {
        let position = self.position(schema, ident)?;
        Ok(&mut self.values[position])
    }

    /// This function reads a field as an integer, coercing from any integer-like variant.
    pub fn int(&self, schema: &Schema, ident: &str) -> Result<i64> {
        let value = self.value(schema, ident)?;
        value.as_int().ok_or_else(|| RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "integer".to_owned()))
    }

    /// This function writes an integer into a field, keeping the variant the field already uses.
    pub fn set_int(&mut self, schema: &Schema, ident: &str, new_value: i64) -> Result<()> {
        let value = self.value_mut(schema, ident)?;
        match value {
            Value::Bool(x) => *x = new_value != 0,
            Value::U8(x) => *x = new_value as u8,
            Value::U16(x) => *x = new_value as u16,
            Value::I16(x) => *x = new_value as i16,
            Value::U32(x) => *x = new_value as u32,
            Value::I32(x) => *x = new_value as i32,
            _ => return Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "integer".to_owned())),
        }

        Ok(())
    }

    /// This function reads a field as a float.
    pub fn f32(&self, schema: &Schema, ident: &str) -> Result<f32> {
        let value = self.value(schema, ident)?;
        value.as_f32().ok_or_else(|| RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "float".to_owned()))
    }

    /// This function writes a float into a field.
    pub fn set_f32(&mut self, schema: &Schema, ident: &str, new_value: f32) -> Result<()> {
        let value = self.value_mut(schema, ident)?;
        match value {
            Value::F32(x) => *x = new_value,
            _ => return Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "float".to_owned())),
        }

        Ok(())
    }

    /// This function reads a field as a string.
    pub fn string(&self, schema: &Schema, ident: &str) -> Result<&str> {
        let value = self.value(schema, ident)?;
        match value {
            Value::String(x) => Ok(x),
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "string".to_owned())),
        }
    }

    /// This function writes a string into a field.
    pub fn set_string(&mut self, schema: &Schema, ident: &str, new_value: &str) -> Result<()> {
        let value = self.value_mut(schema, ident)?;
        match value {
            Value::String(x) => *x = new_value.to_owned(),
            _ => return Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "string".to_owned())),
        }

        Ok(())
    }

    /// This function reads a reference field.
    pub fn link(&self, schema: &Schema, ident: &str) -> Result<Option<usize>> {
        let value = self.value(schema, ident)?;
        match value {
            Value::Link(x) => Ok(*x),
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "link".to_owned())),
        }
    }

    /// This function writes a reference field. No class check happens here; callers
    /// holding the containing file should check the target against the field template.
    pub fn set_link(&mut self, schema: &Schema, ident: &str, new_value: Option<usize>) -> Result<()> {
        let value = self.value_mut(schema, ident)?;
        match value {
            Value::Link(x) => *x = new_value,
            _ => return Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "link".to_owned())),
        }

        Ok(())
    }

    /// This function returns an array field as a slice.
    pub fn list(&self, schema: &Schema, ident: &str) -> Result<&[Value]> {
        let value = self.value(schema, ident)?;
        match value {
            Value::List(x) => Ok(x),
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "list".to_owned())),
        }
    }

    /// This function returns an array field as a mutable vector.
    pub fn list_mut(&mut self, schema: &Schema, ident: &str) -> Result<&mut Vec<Value>> {
        let value = self.value_mut(schema, ident)?;
        match value {
            Value::List(x) => Ok(x),
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "list".to_owned())),
        }
    }

    /// This function resizes an array field, filling new slots with default values.
    ///
    /// This is the only way arrays grow outside of a file read: field writes never
    /// resize anything on their own.
    pub fn resize_list(&mut self, schema: &Schema, ident: &str, new_len: usize) -> Result<()> {
        let position = self.position(schema, ident)?;
        let spec = schema.class(&self.class)?;
        let field = &spec.all_fields[position];
        let filler = element_default(schema, field, self.template.as_deref())?;

        match &mut self.values[position] {
            Value::List(x) => x.resize(new_len, filler),
            value => return Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "list".to_owned())),
        }

        Ok(())
    }

    /// This function reads a compound field as a 3-component vector.
    pub fn vector3(&self, schema: &Schema, ident: &str) -> Result<Vector3<f32>> {
        let value = self.value(schema, ident)?;
        match value {
            Value::Struct(inner) => inner.as_vector3(schema),
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "vector".to_owned())),
        }
    }

    /// This function writes a 3-component vector into a compound field.
    pub fn set_vector3(&mut self, schema: &Schema, ident: &str, new_value: &Vector3<f32>) -> Result<()> {
        let position = self.position(schema, ident)?;
        match &mut self.values[position] {
            Value::Struct(inner) => {
                inner.set_f32(schema, "x", new_value.x)?;
                inner.set_f32(schema, "y", new_value.y)?;
                inner.set_f32(schema, "z", new_value.z)
            }
            value => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "vector".to_owned())),
        }
    }

    /// This function reads the record itself as a 3-component vector.
    pub fn as_vector3(&self, schema: &Schema) -> Result<Vector3<f32>> {
        Ok(Vector3::new(self.f32(schema, "x")?, self.f32(schema, "y")?, self.f32(schema, "z")?))
    }

    /// This function reads a compound field as a 3x3 matrix, in row-major `m{ij}` layout.
    pub fn matrix33(&self, schema: &Schema, ident: &str) -> Result<Matrix3<f32>> {
        let value = self.value(schema, ident)?;
        match value {
            Value::Struct(inner) => {
                let mut matrix = Matrix3::identity();
                for row in 0..3 {
                    for column in 0..3 {
                        matrix[(row, column)] = inner.f32(schema, &format!("m{}{}", row + 1, column + 1))?;
                    }
                }
                Ok(matrix)
            }
            _ => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "matrix".to_owned())),
        }
    }

    /// This function writes a 3x3 matrix into a compound field.
    pub fn set_matrix33(&mut self, schema: &Schema, ident: &str, new_value: &Matrix3<f32>) -> Result<()> {
        let position = self.position(schema, ident)?;
        match &mut self.values[position] {
            Value::Struct(inner) => {
                for row in 0..3 {
                    for column in 0..3 {
                        inner.set_f32(schema, &format!("m{}{}", row + 1, column + 1), new_value[(row, column)])?;
                    }
                }
                Ok(())
            }
            value => Err(RNifError::RecordWrongValueType(ident.to_owned(), value.type_name().to_owned(), "matrix".to_owned())),
        }
    }
}

impl Value {

    /// This function coerces the value to an integer, if its variant allows it.
    pub fn as_int(&self) -> Option<i64> {
        Some(match self {
            Self::Bool(x) => i64::from(*x),
            Self::U8(x) => i64::from(*x),
            Self::U16(x) => i64::from(*x),
            Self::I16(x) => i64::from(*x),
            Self::U32(x) => i64::from(*x),
            Self::I32(x) => i64::from(*x),
            _ => return None,
        })
    }

    /// This function coerces the value to a float, if its variant allows it.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(x) => Some(*x),
            _ => None,
        }
    }

    /// This function returns a human-readable name for the variant, for error reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::F32(_) => "f32",
            Self::String(_) => "string",
            Self::Link(_) => "link",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
        }
    }
}

//---------------------------------------------------------------------------//
//                          Instantiation helpers
//---------------------------------------------------------------------------//

/// This function builds the default value of a field, arrays starting empty.
fn default_value(schema: &Schema, field: &FieldDef, template: Option<&str>) -> Result<Value> {
    if field.arr1.is_some() {
        return Ok(Value::List(vec![]));
    }

    element_default(schema, field, template)
}

/// This function builds the default value a single element of the field would have.
fn element_default(schema: &Schema, field: &FieldDef, template: Option<&str>) -> Result<Value> {
    match resolve_field_type(schema, field, template)? {
        ResolvedType::Codec(codec) => codec_default(schema, codec, field),
        ResolvedType::Struct { class, template } => Ok(Value::Struct(NifStruct::new(schema, class, template)?)),
    }
}

/// This function builds the default value of a basic-typed field, honoring the
/// `default` attribute of the descriptor.
fn codec_default(schema: &Schema, codec: BasicCodec, field: &FieldDef) -> Result<Value> {
    let default = field.default.as_deref();
    let as_int = |fallback: i64| -> Result<i64> {
        match default {
            Some(text) => parse_default_int(schema, field, text),
            None => Ok(fallback),
        }
    };

    Ok(match codec {
        BasicCodec::Bool => Value::Bool(as_int(0)? != 0),
        BasicCodec::Byte => Value::U8(as_int(0)? as u8),
        BasicCodec::UShort => Value::U16(as_int(0)? as u16),
        BasicCodec::Short => Value::I16(as_int(0)? as i16),
        BasicCodec::UInt => Value::U32(as_int(0)? as u32),
        BasicCodec::Int => Value::I32(as_int(0)? as i32),
        BasicCodec::FileVersion => Value::U32(0),
        BasicCodec::Float | BasicCodec::HFloat => {
            let value = match default {
                Some(text) => text.parse::<f32>().map_err(|_| RNifError::SchemaMalformedVersion(text.to_owned()))?,
                None => 0.0,
            };
            Value::F32(value)
        }
        BasicCodec::HeaderString
        | BasicCodec::LineString
        | BasicCodec::SizedString
        | BasicCodec::ShortString
        | BasicCodec::NifString => Value::String(default.unwrap_or_default().to_owned()),
        BasicCodec::Ref | BasicCodec::Ptr => Value::Link(None),
    })
}

/// This function parses an integer default, which for enum-typed fields can also be an option name.
fn parse_default_int(schema: &Schema, field: &FieldDef, text: &str) -> Result<i64> {
    if let FieldKind::Enum(name) = &field.kind {
        let spec = schema.enum_spec(name)?;
        if let Some((_, value)) = spec.options.iter().find(|(option, _)| option == text) {
            return Ok(*value);
        }
    }

    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).map_err(|_| RNifError::SchemaMalformedVersion(text.to_owned()));
    }

    text.parse::<i64>().map_err(|_| RNifError::SchemaMalformedVersion(text.to_owned()))
}

/// This function resolves the declared type of a field to something decodable,
/// substituting the template binding where the descriptor asks for it.
fn resolve_field_type<'a>(schema: &'a Schema, field: &'a FieldDef, template: Option<&'a str>) -> Result<ResolvedType<'a>> {
    match &field.kind {
        FieldKind::Basic(codec) => Ok(ResolvedType::Codec(*codec)),
        FieldKind::Enum(name) => Ok(ResolvedType::Codec(schema.enum_spec(name)?.storage)),
        FieldKind::Compound(name) => {
            let inner_template = match field.template.as_deref() {
                Some("TEMPLATE") => Some(template.ok_or_else(|| RNifError::SchemaUnboundTemplate(field.name.to_owned()))?),
                other => other,
            };
            Ok(ResolvedType::Struct { class: name, template: inner_template })
        }
        FieldKind::TemplateParam => {
            let binding = template.ok_or_else(|| RNifError::SchemaUnboundTemplate(field.name.to_owned()))?;
            if let Some(codec) = schema.basic(binding) {
                return Ok(ResolvedType::Codec(codec));
            }
            if let Ok(spec) = schema.enum_spec(binding) {
                return Ok(ResolvedType::Codec(spec.storage));
            }

            let class = schema.class(binding)?;
            if class.is_niobject {
                return Err(RNifError::SchemaUnknownType(binding.to_owned()));
            }
            Ok(ResolvedType::Struct { class: &class.name, template: None })
        }
    }
}

/// This function resolves the template a reference field checks its target against.
fn link_template<'a>(field: &'a FieldDef, template: Option<&'a str>) -> Option<&'a str> {
    match field.template.as_deref() {
        Some("TEMPLATE") => template,
        other => other,
    }
}

//---------------------------------------------------------------------------//
//                            Field gating
//---------------------------------------------------------------------------//

/// This function decides if a field takes part in the stream for the active
/// version, user version and record state.
pub fn field_active(spec: &ClassSpec, record: &NifStruct, field: &FieldDef, version: u32, user_version: u32) -> Result<bool> {
    if field.ver1.is_some_and(|ver1| version < ver1) {
        return Ok(false);
    }

    if field.ver2.is_some_and(|ver2| version > ver2) {
        return Ok(false);
    }

    if field.user_version.is_some_and(|userver| user_version != userver) {
        return Ok(false);
    }

    if let Some(cond) = &field.cond {
        let lookup = |ident: &str| {
            spec.index.get(ident).and_then(|position| record.values[*position].as_int())
        };

        return Ok(cond.eval(&spec.name, &lookup)? != 0);
    }

    Ok(true)
}

/// This function evaluates an array length expression against the record.
fn eval_length(spec: &ClassSpec, record: &NifStruct, expression: &crate::schema::Expression) -> Result<usize> {
    let lookup = |ident: &str| {
        spec.index.get(ident).and_then(|position| record.values[*position].as_int())
    };

    let length = expression.eval(&spec.name, &lookup)?;
    Ok(length.max(0) as usize)
}

/// This function returns the per-row lengths of a two-dimensional array field: one
/// shared length for rectangular arrays, one length per row when the inner length
/// expression names an array field (jagged arrays, like strip lengths).
fn row_lengths(spec: &ClassSpec, record: &NifStruct, arr2: &crate::schema::Expression, rows: usize) -> Result<Vec<usize>> {
    if let Some(ident) = arr2.as_ident() {
        if let Some(position) = spec.index.get(ident) {
            if let Value::List(lengths) = &record.values[*position] {
                let mut result = Vec::with_capacity(rows);
                for row in 0..rows {
                    let length = lengths.get(row).and_then(Value::as_int).unwrap_or(0);
                    result.push(length.max(0) as usize);
                }
                return Ok(result);
            }
        }
    }

    let length = eval_length(spec, record, arr2)?;
    Ok(vec![length; rows])
}

//---------------------------------------------------------------------------//
//                            Decoding
//---------------------------------------------------------------------------//

/// This function decodes a full instance of the provided class from the stream.
pub fn decode_instance<R: ReadBytes>(schema: &Schema, class: &str, template: Option<&str>, data: &mut R, ctx: &mut DecodeContext) -> Result<NifStruct> {
    let spec = schema.class(class)?;
    let mut record = NifStruct::new(schema, class, template)?;

    for position in 0..spec.all_fields.len() {
        let field = &spec.all_fields[position];
        if !field_active(spec, &record, field, ctx.version, ctx.user_version)? {
            continue;
        }

        let value = match &field.arr1 {
            Some(arr1) => {
                let rows = eval_length(spec, &record, arr1)?;
                match &field.arr2 {
                    Some(arr2) => {
                        let lengths = row_lengths(spec, &record, arr2, rows)?;
                        let mut outer = Vec::new();
                        for length in lengths {
                            let mut inner = Vec::new();
                            for _ in 0..length {
                                inner.push(decode_element(schema, &record, field, data, ctx)?);
                            }
                            outer.push(Value::List(inner));
                        }
                        Value::List(outer)
                    }
                    None => {
                        let mut elements = Vec::new();
                        for _ in 0..rows {
                            elements.push(decode_element(schema, &record, field, data, ctx)?);
                        }
                        Value::List(elements)
                    }
                }
            }
            None => decode_element(schema, &record, field, data, ctx)?,
        };

        record.values[position] = value;
    }

    Ok(record)
}

/// This function decodes one element of a field.
fn decode_element<R: ReadBytes>(schema: &Schema, record: &NifStruct, field: &FieldDef, data: &mut R, ctx: &mut DecodeContext) -> Result<Value> {
    match resolve_field_type(schema, field, record.template.as_deref())? {
        ResolvedType::Codec(codec) => decode_codec(codec, data, ctx),
        ResolvedType::Struct { class, template } => Ok(Value::Struct(decode_instance(schema, class, template, data, ctx)?)),
    }
}

/// This function decodes a single basic value.
fn decode_codec<R: ReadBytes>(codec: BasicCodec, data: &mut R, ctx: &mut DecodeContext) -> Result<Value> {
    Ok(match codec {
        BasicCodec::Bool => {
            let value = if ctx.version > WIDE_BOOL_VERSION { u32::from(data.read_u8()?) } else { data.read_u32()? };
            Value::Bool(value != 0)
        }
        BasicCodec::Byte => Value::U8(data.read_u8()?),
        BasicCodec::UShort => Value::U16(data.read_u16()?),
        BasicCodec::Short => Value::I16(data.read_i16()?),
        BasicCodec::UInt => Value::U32(data.read_u32()?),
        BasicCodec::Int => Value::I32(data.read_i32()?),
        BasicCodec::Float => Value::F32(data.read_f32()?),
        BasicCodec::HFloat => Value::F32(data.read_f16()?.to_f32()),
        BasicCodec::HeaderString => {
            let expected = version_string(ctx.version);
            let line = data.read_line_string(MAX_HEADER_LINE)?;
            if line != expected {
                return Err(RNifError::DecodingHeaderStringMismatch(expected, line));
            }
            Value::String(line)
        }
        BasicCodec::LineString => Value::String(data.read_line_string(MAX_LINE_STRING)?),
        BasicCodec::FileVersion => {
            let echo = data.read_u32()?;
            if echo != ctx.version {
                return Err(RNifError::DecodingVersionEchoMismatch(ctx.version, echo));
            }
            Value::U32(echo)
        }
        BasicCodec::SizedString => Value::String(data.read_sized_string()?),
        BasicCodec::ShortString => Value::String(data.read_short_string()?),
        BasicCodec::NifString => {
            if ctx.version >= INTERNED_STRING_VERSION {
                let index = data.read_i32()?;
                if index == -1 {
                    Value::String(String::new())
                } else {
                    let string = usize::try_from(index)
                        .ok()
                        .and_then(|index| ctx.strings.get(index))
                        .ok_or(RNifError::DecodingStringIndexOutOfBounds(index, ctx.strings.len()))?;
                    Value::String(string.to_owned())
                }
            } else {
                Value::String(data.read_sized_string()?)
            }
        }
        BasicCodec::Ref | BasicCodec::Ptr => {
            let placeholder = data.read_i32()?;
            ctx.link_stack.push_back(placeholder);
            Value::Link(None)
        }
    })
}

//---------------------------------------------------------------------------//
//                            Encoding
//---------------------------------------------------------------------------//

/// This function encodes a full instance into the stream, writing exactly the
/// fields the gates let through for the active version.
pub fn encode_instance<W: WriteBytes>(schema: &Schema, record: &NifStruct, buffer: &mut W, ctx: &EncodeContext) -> Result<()> {
    let spec = schema.class(&record.class)?;

    for (position, field) in spec.all_fields.iter().enumerate() {
        if !field_active(spec, record, field, ctx.version, ctx.user_version)? {
            continue;
        }

        let value = &record.values[position];
        match &field.arr1 {
            Some(arr1) => {
                let Value::List(elements) = value else {
                    return Err(RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "list".to_owned()));
                };

                // The array must agree with its length field. Anything else would
                // write a file the reader cannot get back.
                let rows = eval_length(spec, record, arr1)?;
                if elements.len() != rows {
                    return Err(RNifError::EncodingArrayLengthMismatch(field.ident.to_owned(), rows, elements.len()));
                }

                match &field.arr2 {
                    Some(arr2) => {
                        let lengths = row_lengths(spec, record, arr2, rows)?;
                        for (element, length) in elements.iter().zip(lengths) {
                            let Value::List(inner) = element else {
                                return Err(RNifError::RecordWrongValueType(field.ident.to_owned(), element.type_name().to_owned(), "list".to_owned()));
                            };

                            if inner.len() != length {
                                return Err(RNifError::EncodingArrayLengthMismatch(field.ident.to_owned(), length, inner.len()));
                            }

                            for element in inner {
                                encode_element(schema, record, field, element, buffer, ctx)?;
                            }
                        }
                    }
                    None => for element in elements {
                        encode_element(schema, record, field, element, buffer, ctx)?;
                    },
                }
            }
            None => encode_element(schema, record, field, value, buffer, ctx)?,
        }
    }

    Ok(())
}

/// This function encodes one element of a field.
fn encode_element<W: WriteBytes>(schema: &Schema, record: &NifStruct, field: &FieldDef, value: &Value, buffer: &mut W, ctx: &EncodeContext) -> Result<()> {
    match resolve_field_type(schema, field, record.template.as_deref())? {
        ResolvedType::Codec(codec) => encode_codec(codec, field, value, buffer, ctx),
        ResolvedType::Struct { .. } => match value {
            Value::Struct(inner) => encode_instance(schema, inner, buffer, ctx),
            _ => Err(RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "struct".to_owned())),
        },
    }
}

/// This function encodes a single basic value.
fn encode_codec<W: WriteBytes>(codec: BasicCodec, field: &FieldDef, value: &Value, buffer: &mut W, ctx: &EncodeContext) -> Result<()> {
    let int = || value.as_int().ok_or_else(|| RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "integer".to_owned()));
    let float = || value.as_f32().ok_or_else(|| RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "float".to_owned()));
    let string = || match value {
        Value::String(x) => Ok(x),
        _ => Err(RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "string".to_owned())),
    };

    match codec {
        BasicCodec::Bool => {
            if ctx.version > WIDE_BOOL_VERSION {
                buffer.write_u8(int()? as u8)
            } else {
                buffer.write_u32(int()? as u32)
            }
        }
        BasicCodec::Byte => buffer.write_u8(int()? as u8),
        BasicCodec::UShort => buffer.write_u16(int()? as u16),
        BasicCodec::Short => buffer.write_i16(int()? as i16),
        BasicCodec::UInt => buffer.write_u32(int()? as u32),
        BasicCodec::Int => buffer.write_i32(int()? as i32),
        BasicCodec::Float => buffer.write_f32(float()?),
        BasicCodec::HFloat => buffer.write_f16(half::f16::from_f32(float()?)),
        BasicCodec::HeaderString => buffer.write_line_string(&version_string(ctx.version)),
        BasicCodec::LineString => buffer.write_line_string(string()?),
        BasicCodec::FileVersion => buffer.write_u32(ctx.version),
        BasicCodec::SizedString => buffer.write_sized_string(string()?),
        BasicCodec::ShortString => buffer.write_short_string(string()?),
        BasicCodec::NifString => {
            let string = string()?;
            if ctx.version >= INTERNED_STRING_VERSION {
                if string.is_empty() {
                    buffer.write_i32(-1)
                } else {
                    let index = ctx.strings.get(string).ok_or_else(|| RNifError::EncodingStringNotInTable(string.to_owned()))?;
                    buffer.write_i32(*index)
                }
            } else {
                buffer.write_sized_string(string)
            }
        }
        BasicCodec::Ref | BasicCodec::Ptr => {
            let Value::Link(target) = value else {
                return Err(RNifError::RecordWrongValueType(field.ident.to_owned(), value.type_name().to_owned(), "link".to_owned()));
            };

            match target {
                None => {
                    let null = if ctx.version >= LINK_BY_INDEX_VERSION { -1 } else { 0 };
                    buffer.write_i32(null)
                }
                Some(block) => {
                    let token = ctx.block_tokens.get(block).ok_or(RNifError::EncodingDanglingLink(*block))?;
                    buffer.write_i32(*token)
                }
            }
        }
    }
}

//---------------------------------------------------------------------------//
//                            Graph walks
//---------------------------------------------------------------------------//

/// This function visits every reference field of the record in field order, weak
/// ones included, handing the bound template and the mutable target to the callback.
///
/// The link-resolution pass of the reader drains the link stack through this walk,
/// so it must visit exactly the fields the decode pass read. That's why it gates
/// fields the same way.
pub fn for_each_link<F>(schema: &Schema, record: &mut NifStruct, version: u32, user_version: u32, visit: &mut F) -> Result<()>
where F: FnMut(Option<&str>, bool, &mut Option<usize>) -> Result<()> {
    let spec = schema.class(&record.class)?.clone();
    if !spec.flags.contains(ClassFlags::HAS_LINKS) {
        return Ok(());
    }

    let template = record.template.clone();
    for (position, field) in spec.all_fields.iter().enumerate() {
        if !field_active(&spec, record, field, version, user_version)? {
            continue;
        }

        // Resolve through the template binding, so a parametric field bound to a
        // reference type behaves like a plain reference field.
        let codec = match resolve_field_type(schema, field, template.as_deref())? {
            ResolvedType::Codec(codec) => Some(codec),
            ResolvedType::Struct { .. } => None,
        };
        let weak = codec == Some(BasicCodec::Ptr);
        let is_link = weak || codec == Some(BasicCodec::Ref);

        visit_value(schema, &mut record.values[position], version, user_version, is_link, weak, link_template(field, template.as_deref()), visit)?;
    }

    Ok(())
}

/// Helper recursing into a single value for [`for_each_link`].
fn visit_value<F>(schema: &Schema, value: &mut Value, version: u32, user_version: u32, is_link: bool, weak: bool, template: Option<&str>, visit: &mut F) -> Result<()>
where F: FnMut(Option<&str>, bool, &mut Option<usize>) -> Result<()> {
    match value {
        Value::Link(target) if is_link => visit(template, weak, target),
        Value::Struct(inner) => for_each_link(schema, inner, version, user_version, visit),
        Value::List(elements) => {
            for element in elements {
                visit_value(schema, element, version, user_version, is_link, weak, template, visit)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// This function collects the strong references of the record, in field order. Weak
/// references are invisible here: this is the walk that discovers blocks from roots.
pub fn collect_refs(schema: &Schema, record: &NifStruct, version: u32, user_version: u32, refs: &mut Vec<usize>) -> Result<()> {
    let spec = schema.class(&record.class)?;
    if !spec.flags.contains(ClassFlags::HAS_REFS) {
        return Ok(());
    }

    for (position, field) in spec.all_fields.iter().enumerate() {
        if !field_active(spec, record, field, version, user_version)? {
            continue;
        }

        let strong = matches!(resolve_field_type(schema, field, record.template.as_deref())?, ResolvedType::Codec(BasicCodec::Ref));
        collect_refs_value(schema, &record.values[position], version, user_version, strong, refs)?;
    }

    Ok(())
}

/// Helper recursing into a single value for [`collect_refs`].
fn collect_refs_value(schema: &Schema, value: &Value, version: u32, user_version: u32, strong: bool, refs: &mut Vec<usize>) -> Result<()> {
    match value {
        Value::Link(Some(target)) if strong => {
            refs.push(*target);
            Ok(())
        }
        Value::Struct(inner) => collect_refs(schema, inner, version, user_version, refs),
        Value::List(elements) => {
            for element in elements {
                collect_refs_value(schema, element, version, user_version, strong, refs)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// This function collects every non-empty interned string of the record, in field
/// order. This is the walk that builds the header string table.
pub fn collect_strings(schema: &Schema, record: &NifStruct, version: u32, user_version: u32, strings: &mut Vec<String>) -> Result<()> {
    let spec = schema.class(&record.class)?;
    if !spec.flags.contains(ClassFlags::HAS_STRINGS) {
        return Ok(());
    }

    for (position, field) in spec.all_fields.iter().enumerate() {
        if !field_active(spec, record, field, version, user_version)? {
            continue;
        }

        let interned = matches!(resolve_field_type(schema, field, record.template.as_deref())?, ResolvedType::Codec(BasicCodec::NifString));
        collect_strings_value(schema, &record.values[position], version, user_version, interned, strings)?;
    }

    Ok(())
}

/// Helper recursing into a single value for [`collect_strings`].
fn collect_strings_value(schema: &Schema, value: &Value, version: u32, user_version: u32, interned: bool, strings: &mut Vec<String>) -> Result<()> {
    match value {
        Value::String(string) if interned => {
            if !string.is_empty() {
                strings.push(string.to_owned());
            }
            Ok(())
        }
        Value::Struct(inner) => collect_strings(schema, inner, version, user_version, strings),
        Value::List(elements) => {
            for element in elements {
                collect_strings_value(schema, element, version, user_version, interned, strings)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
