// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! On-disk `FLR\0` chunk format: a 24-byte header, a self-describing
//! event stream, and a type-dictionary trailer checksummed with CRC32 —
//! the same `byteorder` + `crc32fast` framing the teacher's
//! `hdds-recording::format::hdds` module uses for its own container.
//!
//! Every event and value is written self-describing (tagged by name and
//! type, not positionally against an external descriptor), so reading one
//! never requires the trailer to already be parsed; the trailer is still
//! read up front by [`ChunkReader::open`] so every event's *type* is
//! resolvable before any event is decoded, matching the reader contract
//! the transcoder depends on.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::descriptor::{
    AnnotationInstance, AnnotationValueDescriptor, FieldDescriptor, FieldType, SourceEvent,
    SourceObject, SourceTypePool, SourceValue, TypeDescriptor,
};
use crate::error::TranscodeError;

const MAGIC: &[u8; 4] = b"FLR\0";
const FORMAT_VERSION: u32 = 1;

fn write_uleb128<W: Write>(w: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        w.write_u8(byte)?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

fn read_uleb128<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = r.read_u8()?;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_uleb128(w, s.len() as u64)?;
    w.write_all(s.as_bytes())
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_uleb128(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_value<W: Write>(w: &mut W, value: &SourceValue) -> io::Result<()> {
    match value {
        SourceValue::Null => w.write_u8(0),
        SourceValue::Byte(b) => {
            w.write_u8(1)?;
            w.write_i8(*b)
        }
        SourceValue::Short(s) => {
            w.write_u8(2)?;
            w.write_i16::<LittleEndian>(*s)
        }
        SourceValue::Int(i) => {
            w.write_u8(3)?;
            write_uleb128(w, zigzag_encode(*i as i64))
        }
        SourceValue::Long(l) => {
            w.write_u8(4)?;
            write_uleb128(w, zigzag_encode(*l))
        }
        SourceValue::Float(f) => {
            w.write_u8(5)?;
            w.write_f32::<LittleEndian>(*f)
        }
        SourceValue::Double(d) => {
            w.write_u8(6)?;
            w.write_f64::<LittleEndian>(*d)
        }
        SourceValue::Boolean(b) => {
            w.write_u8(7)?;
            w.write_u8(if *b { 1 } else { 0 })
        }
        SourceValue::Char(c) => {
            w.write_u8(8)?;
            write_uleb128(w, *c as u64)
        }
        SourceValue::Str(s) => {
            w.write_u8(9)?;
            write_string(w, s)
        }
        SourceValue::Struct(obj) => {
            w.write_u8(10)?;
            write_string(w, &obj.type_name)?;
            write_uleb128(w, obj.fields.len() as u64)?;
            for (name, v) in &obj.fields {
                write_string(w, name)?;
                write_value(w, v)?;
            }
            Ok(())
        }
        SourceValue::Array(items) => {
            w.write_u8(11)?;
            write_uleb128(w, items.len() as u64)?;
            for item in items {
                write_value(w, item)?;
            }
            Ok(())
        }
    }
}

fn read_value<R: Read>(r: &mut R) -> io::Result<SourceValue> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => SourceValue::Null,
        1 => SourceValue::Byte(r.read_i8()?),
        2 => SourceValue::Short(r.read_i16::<LittleEndian>()?),
        3 => SourceValue::Int(zigzag_decode(read_uleb128(r)?) as i32),
        4 => SourceValue::Long(zigzag_decode(read_uleb128(r)?)),
        5 => SourceValue::Float(r.read_f32::<LittleEndian>()?),
        6 => SourceValue::Double(r.read_f64::<LittleEndian>()?),
        7 => SourceValue::Boolean(r.read_u8()? != 0),
        8 => SourceValue::Char(char::from_u32(read_uleb128(r)? as u32).unwrap_or('\u{fffd}')),
        9 => SourceValue::Str(read_string(r)?),
        10 => {
            let type_name = read_string(r)?;
            let count = read_uleb128(r)? as usize;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                let name = read_string(r)?;
                let value = read_value(r)?;
                fields.push((name, value));
            }
            SourceValue::Struct(SourceObject { type_name, fields })
        }
        11 => {
            let count = read_uleb128(r)? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(r)?);
            }
            SourceValue::Array(items)
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown value tag {other}"),
            ))
        }
    })
}

fn write_event<W: Write>(w: &mut W, type_name: &str, fields: &[(String, SourceValue)]) -> io::Result<()> {
    write_string(w, type_name)?;
    write_uleb128(w, fields.len() as u64)?;
    for (name, value) in fields {
        write_string(w, name)?;
        write_value(w, value)?;
    }
    Ok(())
}

fn read_event<R: Read>(r: &mut R) -> io::Result<SourceEvent> {
    let type_name = read_string(r)?;
    let count = read_uleb128(r)? as usize;
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_string(r)?;
        let value = read_value(r)?;
        fields.push((name, value));
    }
    Ok(SourceEvent { type_name, fields })
}

fn field_type_tag(ft: &FieldType) -> u8 {
    match ft {
        FieldType::Byte => 0,
        FieldType::Short => 1,
        FieldType::Int => 2,
        FieldType::Long => 3,
        FieldType::Float => 4,
        FieldType::Double => 5,
        FieldType::Boolean => 6,
        FieldType::Char => 7,
        FieldType::String => 8,
        FieldType::Struct(_) => 9,
    }
}

fn write_field_descriptor<W: Write>(w: &mut W, f: &FieldDescriptor) -> io::Result<()> {
    write_string(w, &f.name)?;
    w.write_u8(field_type_tag(&f.field_type))?;
    if let FieldType::Struct(name) = &f.field_type {
        write_string(w, name)?;
    }
    w.write_u8(if f.array { 1 } else { 0 })
}

fn read_field_descriptor<R: Read>(r: &mut R) -> io::Result<FieldDescriptor> {
    let name = read_string(r)?;
    let tag = r.read_u8()?;
    let field_type = match tag {
        0 => FieldType::Byte,
        1 => FieldType::Short,
        2 => FieldType::Int,
        3 => FieldType::Long,
        4 => FieldType::Float,
        5 => FieldType::Double,
        6 => FieldType::Boolean,
        7 => FieldType::Char,
        8 => FieldType::String,
        9 => FieldType::Struct(read_string(r)?),
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown field type tag {other}"),
            ))
        }
    };
    let array = r.read_u8()? != 0;
    Ok(FieldDescriptor { name, field_type, array })
}

fn write_annotation<W: Write>(w: &mut W, a: &AnnotationInstance) -> io::Result<()> {
    write_string(w, &a.type_name)?;
    write_uleb128(w, a.values.len() as u64)?;
    for v in &a.values {
        write_string(w, &v.name)?;
        match &v.value {
            Some(s) => {
                w.write_u8(1)?;
                write_string(w, s)?;
            }
            None => w.write_u8(0)?,
        }
    }
    Ok(())
}

fn read_annotation<R: Read>(r: &mut R) -> io::Result<AnnotationInstance> {
    let type_name = read_string(r)?;
    let count = read_uleb128(r)? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_string(r)?;
        let has_value = r.read_u8()? != 0;
        let value = if has_value { Some(read_string(r)?) } else { None };
        values.push(AnnotationValueDescriptor { name, value });
    }
    Ok(AnnotationInstance { type_name, values })
}

fn write_type_descriptor<W: Write>(w: &mut W, t: &TypeDescriptor) -> io::Result<()> {
    write_string(w, &t.name)?;
    write_uleb128(w, t.fields.len() as u64)?;
    for f in &t.fields {
        write_field_descriptor(w, f)?;
    }
    let cp_byte = match t.is_constant_pool {
        Some(true) => 1,
        Some(false) => 0,
        None => 2,
    };
    w.write_u8(cp_byte)?;
    write_uleb128(w, t.annotations.len() as u64)?;
    for a in &t.annotations {
        write_annotation(w, a)?;
    }
    Ok(())
}

fn read_type_descriptor<R: Read>(r: &mut R) -> io::Result<TypeDescriptor> {
    let name = read_string(r)?;
    let field_count = read_uleb128(r)? as usize;
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        fields.push(read_field_descriptor(r)?);
    }
    let cp_byte = r.read_u8()?;
    let is_constant_pool = match cp_byte {
        1 => Some(true),
        0 => Some(false),
        _ => None,
    };
    let annotation_count = read_uleb128(r)? as usize;
    let mut annotations = Vec::with_capacity(annotation_count);
    for _ in 0..annotation_count {
        annotations.push(read_annotation(r)?);
    }
    Ok(TypeDescriptor { name, fields, annotations, is_constant_pool })
}

struct ChunkHeader {
    version: u32,
    type_dict_offset: u64,
    event_count: u64,
}

impl ChunkHeader {
    const SIZE: u64 = 4 + 4 + 8 + 8;

    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u64::<LittleEndian>(self.type_dict_offset)?;
        w.write_u64::<LittleEndian>(self.event_count)
    }

    fn read<R: Read>(r: &mut R) -> Result<Self, TranscodeError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(TranscodeError::MalformedChunk("bad magic".into()));
        }
        let version = r.read_u32::<LittleEndian>()?;
        let type_dict_offset = r.read_u64::<LittleEndian>()?;
        let event_count = r.read_u64::<LittleEndian>()?;
        Ok(Self { version, type_dict_offset, event_count })
    }
}

/// Reads one `.flr` recording: the header and type-dictionary trailer are
/// parsed up front so `type_pool()` is fully populated before the first
/// call to [`ChunkReader::next_event`].
pub struct ChunkReader {
    file: File,
    header: ChunkHeader,
    type_pool: SourceTypePool,
    events_read: u64,
}

impl ChunkReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TranscodeError> {
        let mut file = File::open(path)?;
        let header = ChunkHeader::read(&mut file)?;
        if header.version != FORMAT_VERSION {
            return Err(TranscodeError::MalformedChunk(format!(
                "unsupported chunk version {}",
                header.version
            )));
        }
        let total_len = file.metadata()?.len();

        file.seek(SeekFrom::Start(header.type_dict_offset))?;
        let trailer_len = total_len
            .saturating_sub(header.type_dict_offset)
            .saturating_sub(4) as usize;
        let mut trailer_bytes = vec![0u8; trailer_len];
        file.read_exact(&mut trailer_bytes)?;
        let mut stored_crc = [0u8; 4];
        file.read_exact(&mut stored_crc)?;
        let stored_crc = u32::from_le_bytes(stored_crc);
        if crc32fast::hash(&trailer_bytes) != stored_crc {
            return Err(TranscodeError::ChecksumMismatch);
        }

        let mut cursor = Cursor::new(trailer_bytes);
        let type_count = read_uleb128(&mut cursor)? as usize;
        let mut type_pool = SourceTypePool::new();
        for _ in 0..type_count {
            type_pool.insert(read_type_descriptor(&mut cursor)?);
        }

        file.seek(SeekFrom::Start(ChunkHeader::SIZE))?;
        Ok(Self { file, header, type_pool, events_read: 0 })
    }

    pub fn type_pool(&self) -> &SourceTypePool {
        &self.type_pool
    }

    pub fn event_count(&self) -> u64 {
        self.header.event_count
    }

    /// Returns the next event, or `None` once every event the header
    /// declared has been read.
    pub fn next_event(&mut self) -> Result<Option<SourceEvent>, TranscodeError> {
        if self.events_read >= self.header.event_count {
            return Ok(None);
        }
        let event = read_event(&mut self.file)?;
        self.events_read += 1;
        Ok(Some(event))
    }
}

/// Writes a new `.flr` recording. The header is written as a placeholder
/// at [`ChunkWriter::create`] time and patched once [`ChunkWriter::finish`]
/// knows the final event count and trailer offset — the same
/// seek-back-and-patch technique the teacher's `HddsWriter` uses for its
/// own `FileHeader`.
pub struct ChunkWriter {
    file: File,
    event_count: u64,
}

impl ChunkWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TranscodeError> {
        let mut file = File::create(path)?;
        ChunkHeader { version: FORMAT_VERSION, type_dict_offset: 0, event_count: 0 }.write(&mut file)?;
        Ok(Self { file, event_count: 0 })
    }

    pub fn write_event(&mut self, type_name: &str, fields: &[(String, SourceValue)]) -> Result<(), TranscodeError> {
        write_event(&mut self.file, type_name, fields)?;
        self.event_count += 1;
        Ok(())
    }

    /// Write the type-dictionary trailer, checksum it, and patch the
    /// header with its offset and the final event count.
    pub fn finish(mut self, types: &[TypeDescriptor]) -> Result<(), TranscodeError> {
        let type_dict_offset = self.file.stream_position()?;

        let mut trailer = Vec::new();
        write_uleb128(&mut trailer, types.len() as u64)?;
        for t in types {
            write_type_descriptor(&mut trailer, t)?;
        }
        self.file.write_all(&trailer)?;
        let crc = crc32fast::hash(&trailer);
        self.file.write_u32::<LittleEndian>(crc)?;

        self.file.seek(SeekFrom::Start(0))?;
        ChunkHeader { version: FORMAT_VERSION, type_dict_offset, event_count: self.event_count }
            .write(&mut self.file)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SourceObject;

    fn sample_types() -> Vec<TypeDescriptor> {
        vec![TypeDescriptor {
            name: "jdk.ExecutionSample".to_string(),
            fields: vec![
                FieldDescriptor::new("startTime", FieldType::Long, false),
                FieldDescriptor::new("sampledThread", FieldType::Struct("jdk.types.Thread".into()), false),
            ],
            annotations: vec![AnnotationInstance {
                type_name: "jdk.jfr.Category".to_string(),
                values: vec![AnnotationValueDescriptor { name: "value".into(), value: Some("Java Application".into()) }],
            }],
            is_constant_pool: Some(false),
        }]
    }

    #[test]
    fn value_round_trips_through_leb128() {
        let values = vec![
            SourceValue::Null,
            SourceValue::Long(-9000),
            SourceValue::Int(42),
            SourceValue::Str("/Users/alice/project".into()),
            SourceValue::Array(vec![SourceValue::Int(1), SourceValue::Int(2)]),
            SourceValue::Struct(SourceObject {
                type_name: "jdk.types.Thread".into(),
                fields: vec![("javaName".into(), SourceValue::Str("main".into()))],
            }),
        ];
        for value in values {
            let mut buf = Vec::new();
            write_value(&mut buf, &value).unwrap();
            let mut cursor = Cursor::new(buf);
            let decoded = read_value(&mut cursor).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn type_descriptor_round_trips() {
        let ty = &sample_types()[0];
        let mut buf = Vec::new();
        write_type_descriptor(&mut buf, ty).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_type_descriptor(&mut cursor).unwrap();
        assert_eq!(&decoded, ty);
    }

    #[test]
    fn writer_then_reader_round_trips_events_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.flr");

        let mut writer = ChunkWriter::create(&path).unwrap();
        writer
            .write_event(
                "jdk.ExecutionSample",
                &[
                    ("startTime".into(), SourceValue::Long(1000)),
                    (
                        "sampledThread".into(),
                        SourceValue::Struct(SourceObject {
                            type_name: "jdk.types.Thread".into(),
                            fields: vec![("javaName".into(), SourceValue::Str("main".into()))],
                        }),
                    ),
                ],
            )
            .unwrap();
        writer.finish(&sample_types()).unwrap();

        let mut reader = ChunkReader::open(&path).unwrap();
        assert_eq!(reader.event_count(), 1);
        assert_eq!(reader.type_pool().len(), 1);

        let event = reader.next_event().unwrap().unwrap();
        assert_eq!(event.type_name, "jdk.ExecutionSample");
        assert_eq!(event.get("startTime"), Some(&SourceValue::Long(1000)));
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.flr");
        std::fs::write(&path, b"NOPE0000000000000000000000").unwrap();
        let err = ChunkReader::open(&path).unwrap_err();
        assert!(matches!(err, TranscodeError::MalformedChunk(_)));
    }
}
