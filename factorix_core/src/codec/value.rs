//! The recursive property-tree value and its tag-dispatched encoding
//! (§4.4, §9 "Dynamic class dispatch on tag bytes").

use std::io::{Read, Write};

use crate::error::{Error, Result};

use super::primitives::{
  read_bool, read_double, read_optim_u32, read_string, read_string_property, read_u32, read_u8,
  write_bool, write_double, write_optim_u32, write_string, write_string_property, write_u32, write_u8,
};

const TAG_BOOL: u8 = 1;
const TAG_DOUBLE: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_LIST: u8 = 4;
const TAG_DICTIONARY: u8 = 5;

/// A property-tree value: the closed sum type `Bool | Number | Str | List |
/// Dict` the binary format tag-dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Bool(bool),
  Number(f64),
  Str(String),
  List(Vec<Value>),
  Dict(Vec<(String, Value)>),
}

impl Value {
  fn tag(&self) -> u8 {
    match self {
      Value::Bool(_) => TAG_BOOL,
      Value::Number(_) => TAG_DOUBLE,
      Value::Str(_) => TAG_STRING,
      Value::List(_) => TAG_LIST,
      Value::Dict(_) => TAG_DICTIONARY,
    }
  }

  /// `u8 tag | bool any-type-flag | payload`. The flag is always emitted as
  /// `false`; the core only ever writes homogeneous trees (§4.4).
  pub fn encode(&self, w: &mut impl Write) -> Result<()> {
    write_u8(w, self.tag())?;
    write_bool(w, false)?;
    match self {
      Value::Bool(b) => write_bool(w, *b),
      Value::Number(n) => write_double(w, *n),
      Value::Str(s) => write_string_property(w, s),
      Value::List(items) => {
        write_optim_u32(w, items.len() as u32)?;
        for item in items {
          item.encode(w)?;
        }
        Ok(())
      }
      Value::Dict(entries) => {
        write_u32(w, entries.len() as u32)?;
        for (key, value) in entries {
          write_string(w, key)?;
          value.encode(w)?;
        }
        Ok(())
      }
    }
  }

  /// Reads one tag-dispatched value, discarding the any-type-flag after
  /// reading it (§4.4).
  pub fn decode(r: &mut impl Read) -> Result<Value> {
    let tag = read_u8(r)?;
    let _any_type_flag = read_bool(r)?;
    match tag {
      TAG_BOOL => Ok(Value::Bool(read_bool(r)?)),
      TAG_DOUBLE => Ok(Value::Number(read_double(r)?)),
      TAG_STRING => Ok(Value::Str(read_string_property(r)?)),
      TAG_LIST => {
        let count = read_optim_u32(r)?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
          items.push(Value::decode(r)?);
        }
        Ok(Value::List(items))
      }
      TAG_DICTIONARY => {
        let count = read_u32(r)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
          let key = read_string(r)?;
          let value = Value::decode(r)?;
          entries.push((key, value));
        }
        Ok(Value::Dict(entries))
      }
      other => Err(Error::UnknownPropertyType(other)),
    }
  }

  pub fn as_dict(&self) -> Option<&[(String, Value)]> {
    match self {
      Value::Dict(entries) => Some(entries),
      _ => None,
    }
  }

  pub fn dict_get(&self, key: &str) -> Option<&Value> {
    self.as_dict()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(value: Value) {
    let mut buf = Vec::new();
    value.encode(&mut buf).unwrap();
    let decoded = Value::decode(&mut &buf[..]).unwrap();
    assert_eq!(decoded, value);
  }

  #[test]
  fn roundtrips_primitives() {
    roundtrip(Value::Bool(true));
    roundtrip(Value::Bool(false));
    roundtrip(Value::Number(42.5));
    roundtrip(Value::Number(0.0));
    roundtrip(Value::Str(String::new()));
    roundtrip(Value::Str("hello world".into()));
  }

  #[test]
  fn roundtrips_nested_structures() {
    let tree = Value::Dict(vec![
      (
        "settings".into(),
        Value::List(vec![Value::Bool(true), Value::Number(1.0), Value::Str("x".into())]),
      ),
      ("nested".into(), Value::Dict(vec![("k".into(), Value::Bool(false))])),
    ]);
    roundtrip(tree);
  }

  #[test]
  fn unknown_tag_fails() {
    let buf = vec![0x09, 0x00];
    let err = Value::decode(&mut &buf[..]).unwrap_err();
    assert!(matches!(err, Error::UnknownPropertyType(9)));
  }
}
