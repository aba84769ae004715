//! Binary encode/decode for the replay format.
//!
//! All integers are little-endian. Strings are length-prefixed with a `u32`
//! length. Records are written depth-first: tag, flags, optional
//! `from_side`, attributes, then children.

use std::io::{ErrorKind, Read, Write};

use indexmap::IndexMap;
use warband_core::SideId;

use crate::error::ReplayError;
use crate::record::{ActionRecord, AttrValue};
use crate::types::{BuildMetadata, RngPolicy, ScenarioDescriptor};
use crate::{FORMAT_VERSION, MAGIC};

/// Deepest child nesting the decoder accepts.
pub const MAX_DEPTH: usize = 32;

const FLAG_DEPENDENT: u8 = 0b001;
const FLAG_SIDE_INVALID: u8 = 0b010;
const FLAG_FROM_SIDE: u8 = 0b100;

const VALUE_BOOL: u8 = 0;
const VALUE_INT: u8 = 1;
const VALUE_TEXT: u8 = 2;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ReplayError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i64.
pub fn write_i64_le(w: &mut dyn Write, v: i64) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), ReplayError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ReplayError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ReplayError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ReplayError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i64.
pub fn read_i64_le(r: &mut dyn Read) -> Result<i64, ReplayError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, ReplayError> {
    let len = read_u32_le(r)? as usize;
    read_str_body(r, len)
}

fn read_str_body(r: &mut dyn Read, len: usize) -> Result<String, ReplayError> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| ReplayError::MalformedRecord {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

// ── Header encode/decode ────────────────────────────────────────

/// Encode the replay file header (magic, version, build metadata, scenario).
pub fn encode_header(
    w: &mut dyn Write,
    meta: &BuildMetadata,
    scenario: &ScenarioDescriptor,
) -> Result<(), ReplayError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;

    write_length_prefixed_str(w, &meta.toolchain)?;
    write_length_prefixed_str(w, &meta.target_triple)?;
    write_length_prefixed_str(w, &meta.warband_version)?;
    write_length_prefixed_str(w, &meta.compile_flags)?;

    write_u64_le(w, scenario.seed)?;
    write_u8(w, scenario.rng_policy.code())?;
    write_length_prefixed_str(w, &scenario.scenario_id)?;
    write_u64_le(w, scenario.config_hash)?;
    Ok(())
}

/// Decode and validate the replay file header.
pub fn decode_header(
    r: &mut dyn Read,
) -> Result<(BuildMetadata, ScenarioDescriptor), ReplayError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ReplayError::InvalidMagic);
    }

    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: version });
    }

    let meta = BuildMetadata {
        toolchain: read_length_prefixed_str(r)?,
        target_triple: read_length_prefixed_str(r)?,
        warband_version: read_length_prefixed_str(r)?,
        compile_flags: read_length_prefixed_str(r)?,
    };

    let seed = read_u64_le(r)?;
    let policy = read_u8(r)?;
    let rng_policy = RngPolicy::from_code(policy).ok_or_else(|| ReplayError::MalformedRecord {
        detail: format!("unknown rng policy code {policy}"),
    })?;
    let scenario = ScenarioDescriptor {
        seed,
        rng_policy,
        scenario_id: read_length_prefixed_str(r)?,
        config_hash: read_u64_le(r)?,
    };
    Ok((meta, scenario))
}

// ── Record encode/decode ────────────────────────────────────────

/// Encode one record and its children.
pub fn encode_record(w: &mut dyn Write, rec: &ActionRecord) -> Result<(), ReplayError> {
    write_length_prefixed_str(w, &rec.tag)?;

    let mut flags = 0;
    if rec.dependent {
        flags |= FLAG_DEPENDENT;
    }
    if rec.side_invalid {
        flags |= FLAG_SIDE_INVALID;
    }
    if rec.from_side.is_some() {
        flags |= FLAG_FROM_SIDE;
    }
    write_u8(w, flags)?;
    if let Some(side) = rec.from_side {
        write_u32_le(w, side.0)?;
    }

    write_u32_le(w, rec.attrs.len() as u32)?;
    for (key, value) in &rec.attrs {
        write_length_prefixed_str(w, key)?;
        match value {
            AttrValue::Bool(b) => {
                write_u8(w, VALUE_BOOL)?;
                write_u8(w, u8::from(*b))?;
            }
            AttrValue::Int(i) => {
                write_u8(w, VALUE_INT)?;
                write_i64_le(w, *i)?;
            }
            AttrValue::Text(s) => {
                write_u8(w, VALUE_TEXT)?;
                write_length_prefixed_str(w, s)?;
            }
        }
    }

    write_u32_le(w, rec.children.len() as u32)?;
    for child in &rec.children {
        encode_record(w, child)?;
    }
    Ok(())
}

/// Decode one top-level record.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(record))`
/// on success, or an error on truncated/corrupt data.
pub fn decode_record(r: &mut dyn Read) -> Result<Option<ActionRecord>, ReplayError> {
    // Read the tag length byte-by-byte to distinguish clean EOF (zero bytes
    // available) from truncation (1-3 bytes before EOF).
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ReplayError::MalformedRecord {
                    detail: format!("truncated record header: got {filled} of 4 bytes"),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReplayError::Io(e)),
        }
    }
    let tag_len = u32::from_le_bytes(len_buf) as usize;
    let tag = read_str_body(r, tag_len)?;
    decode_record_body(r, tag, 0).map(Some)
}

fn decode_nested(r: &mut dyn Read, depth: usize) -> Result<ActionRecord, ReplayError> {
    if depth > MAX_DEPTH {
        return Err(ReplayError::TooDeep { max: MAX_DEPTH });
    }
    let tag = read_length_prefixed_str(r)?;
    decode_record_body(r, tag, depth)
}

fn decode_record_body(
    r: &mut dyn Read,
    tag: String,
    depth: usize,
) -> Result<ActionRecord, ReplayError> {
    let flags = read_u8(r)?;
    if flags & !(FLAG_DEPENDENT | FLAG_SIDE_INVALID | FLAG_FROM_SIDE) != 0 {
        return Err(ReplayError::MalformedRecord {
            detail: format!("unknown flag bits {flags:#04x} in [{tag}]"),
        });
    }
    let from_side = if flags & FLAG_FROM_SIDE != 0 {
        Some(SideId(read_u32_le(r)?))
    } else {
        None
    };

    let attr_count = read_u32_le(r)? as usize;
    let mut attrs = IndexMap::with_capacity(attr_count.min(64));
    for _ in 0..attr_count {
        let key = read_length_prefixed_str(r)?;
        let value = match read_u8(r)? {
            VALUE_BOOL => match read_u8(r)? {
                0 => AttrValue::Bool(false),
                1 => AttrValue::Bool(true),
                b => {
                    return Err(ReplayError::MalformedRecord {
                        detail: format!("invalid bool byte {b} for '{key}'"),
                    })
                }
            },
            VALUE_INT => AttrValue::Int(read_i64_le(r)?),
            VALUE_TEXT => AttrValue::Text(read_length_prefixed_str(r)?),
            tag => return Err(ReplayError::UnknownValueType { tag }),
        };
        attrs.insert(key, value);
    }

    let child_count = read_u32_le(r)? as usize;
    let mut children = Vec::with_capacity(child_count.min(64));
    for _ in 0..child_count {
        children.push(decode_nested(r, depth + 1)?);
    }

    Ok(ActionRecord {
        tag,
        attrs,
        children,
        dependent: flags & FLAG_DEPENDENT != 0,
        from_side,
        side_invalid: flags & FLAG_SIDE_INVALID != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tags;
    use warband_core::Location;

    fn encoded(rec: &ActionRecord) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_record(&mut buf, rec).unwrap();
        buf
    }

    #[test]
    fn nested_record_roundtrip() {
        let rec = ActionRecord::new(tags::RECRUIT)
            .with("type", "Elvish Fighter")
            .with("side", 1)
            .with("show", true)
            .with_location(Location::new(3, 2))
            .with_child(ActionRecord::new(tags::FROM).with_location(Location::new(2, 2)));
        let buf = encoded(&rec);
        let back = decode_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn flags_roundtrip() {
        let mut rec = ActionRecord::dependent("pick").with_from_side(SideId(3));
        rec.side_invalid = true;
        let buf = encoded(&rec);
        let back = decode_record(&mut buf.as_slice()).unwrap().unwrap();
        assert!(back.dependent);
        assert!(back.side_invalid);
        assert_eq!(back.from_side, Some(SideId(3)));
    }

    #[test]
    fn clean_eof_is_none() {
        let empty: &[u8] = &[];
        assert!(decode_record(&mut &*empty).unwrap().is_none());
    }

    #[test]
    fn truncated_header_errors() {
        let partial: &[u8] = &[5, 0];
        assert!(matches!(
            decode_record(&mut &*partial),
            Err(ReplayError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn unknown_value_type_rejected() {
        let rec = ActionRecord::new("x").with("k", 1);
        let mut buf = encoded(&rec);
        // tag(4+1) flags(1) count(4) key(4+1) -> value type byte
        buf[15] = 9;
        assert!(matches!(
            decode_record(&mut buf.as_slice()),
            Err(ReplayError::UnknownValueType { tag: 9 })
        ));
    }

    #[test]
    fn excessive_nesting_rejected() {
        let mut rec = ActionRecord::new("leaf");
        for _ in 0..=MAX_DEPTH + 1 {
            rec = ActionRecord::new("n").with_child(rec);
        }
        let buf = encoded(&rec);
        assert!(matches!(
            decode_record(&mut buf.as_slice()),
            Err(ReplayError::TooDeep { .. })
        ));
    }

    #[test]
    fn header_roundtrip() {
        let meta = BuildMetadata {
            toolchain: "t".into(),
            target_triple: "x".into(),
            warband_version: "0.1.0".into(),
            compile_flags: "test".into(),
        };
        let scenario = ScenarioDescriptor {
            seed: 7,
            rng_policy: RngPolicy::Deterministic,
            scenario_id: "skirmish".into(),
            config_hash: 0xABCD,
        };
        let mut buf = Vec::new();
        encode_header(&mut buf, &meta, &scenario).unwrap();
        let (m, s) = decode_header(&mut buf.as_slice()).unwrap();
        assert_eq!(m, meta);
        assert_eq!(s, scenario);
    }
}
