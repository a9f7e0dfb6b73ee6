//! Little-endian primitive encodings used by the property-tree codec
//! (§4.4).

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::version::{GameVersion, ModVersion};

pub fn write_u8(w: &mut impl Write, value: u8) -> Result<()> {
  w.write_all(&[value])?;
  Ok(())
}

pub fn read_u8(r: &mut impl Read) -> Result<u8> {
  let mut buf = [0u8; 1];
  r.read_exact(&mut buf)?;
  Ok(buf[0])
}

pub fn write_u16(w: &mut impl Write, value: u16) -> Result<()> {
  w.write_all(&value.to_le_bytes())?;
  Ok(())
}

pub fn read_u16(r: &mut impl Read) -> Result<u16> {
  let mut buf = [0u8; 2];
  r.read_exact(&mut buf)?;
  Ok(u16::from_le_bytes(buf))
}

pub fn write_u32(w: &mut impl Write, value: u32) -> Result<()> {
  w.write_all(&value.to_le_bytes())?;
  Ok(())
}

pub fn read_u32(r: &mut impl Read) -> Result<u32> {
  let mut buf = [0u8; 4];
  r.read_exact(&mut buf)?;
  Ok(u32::from_le_bytes(buf))
}

pub fn write_i64(w: &mut impl Write, value: i64) -> Result<()> {
  w.write_all(&value.to_le_bytes())?;
  Ok(())
}

pub fn read_i64(r: &mut impl Read) -> Result<i64> {
  let mut buf = [0u8; 8];
  r.read_exact(&mut buf)?;
  Ok(i64::from_le_bytes(buf))
}

pub fn write_u64(w: &mut impl Write, value: u64) -> Result<()> {
  w.write_all(&value.to_le_bytes())?;
  Ok(())
}

pub fn read_u64(r: &mut impl Read) -> Result<u64> {
  let mut buf = [0u8; 8];
  r.read_exact(&mut buf)?;
  Ok(u64::from_le_bytes(buf))
}

/// One byte for values under `0xFF`; otherwise a `0xFF` marker followed by
/// the fixed-width little-endian value.
pub fn write_optim_u16(w: &mut impl Write, value: u16) -> Result<()> {
  if value < 0xFF {
    write_u8(w, value as u8)
  } else {
    write_u8(w, 0xFF)?;
    write_u16(w, value)
  }
}

pub fn read_optim_u16(r: &mut impl Read) -> Result<u16> {
  let marker = read_u8(r)?;
  if marker == 0xFF {
    read_u16(r)
  } else {
    Ok(marker as u16)
  }
}

pub fn write_optim_u32(w: &mut impl Write, value: u32) -> Result<()> {
  if value < 0xFF {
    write_u8(w, value as u8)
  } else {
    write_u8(w, 0xFF)?;
    write_u32(w, value)
  }
}

pub fn read_optim_u32(r: &mut impl Read) -> Result<u32> {
  let marker = read_u8(r)?;
  if marker == 0xFF {
    read_u32(r)
  } else {
    Ok(marker as u32)
  }
}

pub fn write_bool(w: &mut impl Write, value: bool) -> Result<()> {
  write_u8(w, if value { 0x01 } else { 0x00 })
}

pub fn read_bool(r: &mut impl Read) -> Result<bool> {
  Ok(read_u8(r)? != 0x00)
}

pub fn write_double(w: &mut impl Write, value: f64) -> Result<()> {
  w.write_all(&value.to_le_bytes())?;
  Ok(())
}

pub fn read_double(r: &mut impl Read) -> Result<f64> {
  let mut buf = [0u8; 8];
  r.read_exact(&mut buf)?;
  Ok(f64::from_le_bytes(buf))
}

fn write_string_body(w: &mut impl Write, value: &str) -> Result<()> {
  write_optim_u32(w, value.len() as u32)?;
  w.write_all(value.as_bytes())?;
  Ok(())
}

fn read_string_body(r: &mut impl Read, len: u32) -> Result<String> {
  let mut buf = vec![0u8; len as usize];
  r.read_exact(&mut buf)?;
  String::from_utf8(buf).map_err(|e| Error::EncodingError(e.to_string()))
}

/// `optim_u32(byte_length) | utf8_bytes` — used for dictionary keys, which
/// are always present.
pub fn write_string(w: &mut impl Write, value: &str) -> Result<()> {
  write_string_body(w, value)
}

pub fn read_string(r: &mut impl Read) -> Result<String> {
  let len = read_optim_u32(r)?;
  read_string_body(r, len)
}

/// `bool no_string | [length+bytes]` — used for the `String` property-tree
/// value. An empty string sets the `no_string` flag and emits nothing else.
pub fn write_string_property(w: &mut impl Write, value: &str) -> Result<()> {
  if value.is_empty() {
    write_bool(w, true)
  } else {
    write_bool(w, false)?;
    write_string_body(w, value)
  }
}

pub fn read_string_property(r: &mut impl Read) -> Result<String> {
  let no_string = read_bool(r)?;
  if no_string {
    Ok(String::new())
  } else {
    let len = read_optim_u32(r)?;
    read_string_body(r, len)
  }
}

pub fn write_game_version(w: &mut impl Write, version: GameVersion) -> Result<()> {
  write_u16(w, version.major)?;
  write_u16(w, version.minor)?;
  write_u16(w, version.patch)?;
  write_u16(w, version.build)
}

pub fn read_game_version(r: &mut impl Read) -> Result<GameVersion> {
  Ok(GameVersion::new(
    read_u16(r)?,
    read_u16(r)?,
    read_u16(r)?,
    read_u16(r)?,
  ))
}

pub fn write_mod_version(w: &mut impl Write, version: ModVersion) -> Result<()> {
  write_u8(w, version.major)?;
  write_u8(w, version.minor)?;
  write_u8(w, version.patch)
}

pub fn read_mod_version(r: &mut impl Read) -> Result<ModVersion> {
  Ok(ModVersion::new(read_u8(r)?, read_u8(r)?, read_u8(r)?))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip_optim_u16(value: u16, expected_bytes: &[u8]) {
    let mut buf = Vec::new();
    write_optim_u16(&mut buf, value).unwrap();
    assert_eq!(buf, expected_bytes);
    assert_eq!(read_optim_u16(&mut &buf[..]).unwrap(), value);
  }

  #[test]
  fn optim_u16_boundaries() {
    roundtrip_optim_u16(254, &[0xFE]);
    roundtrip_optim_u16(255, &[0xFF, 0xFF, 0x00]);
    roundtrip_optim_u16(2023, &[0xFF, 0xE7, 0x07]);
  }

  #[test]
  fn string_property_empty_uses_no_string_flag() {
    let mut buf = Vec::new();
    write_string_property(&mut buf, "").unwrap();
    assert_eq!(buf, vec![0x01]);
    assert_eq!(read_string_property(&mut &buf[..]).unwrap(), "");
  }

  #[test]
  fn string_property_roundtrip() {
    let mut buf = Vec::new();
    write_string_property(&mut buf, "hello").unwrap();
    assert_eq!(read_string_property(&mut &buf[..]).unwrap(), "hello");
  }
}
