//! `"rgba:RRGGBBAA"` <-> the property tree's `{r, g, b, a}` dictionary form
//! (§4.4 "RGBA strings").

use crate::error::Error;

use super::value::Value;

const COMPONENT_KEYS: [&str; 4] = ["r", "g", "b", "a"];

/// Parses `"rgba:RRGGBBAA"` into a dictionary `{r,g,b,a}` of doubles in
/// `[0, 1]`.
pub fn parse_rgba(s: &str) -> Result<Value, Error> {
  let hex = s
    .strip_prefix("rgba:")
    .ok_or_else(|| Error::EncodingError(format!("not an rgba color string: `{s}`")))?;
  if hex.len() != 8 {
    return Err(Error::EncodingError(format!("rgba color string has wrong length: `{s}`")));
  }

  let mut components = Vec::with_capacity(4);
  for (key, chunk_start) in COMPONENT_KEYS.iter().zip((0..8).step_by(2)) {
    let byte = u8::from_str_radix(&hex[chunk_start..chunk_start + 2], 16)
      .map_err(|_| Error::EncodingError(format!("invalid hex component in `{s}`")))?;
    components.push((key.to_string(), Value::Number(byte as f64 / 255.0)));
  }

  Ok(Value::Dict(components))
}

/// Recognizes a dictionary with exactly the four `r,g,b,a` keys in that
/// layout and renders it back to `"rgba:RRGGBBAA"`.
pub fn format_rgba(value: &Value) -> Option<String> {
  let entries = value.as_dict()?;
  if entries.len() != 4 {
    return None;
  }
  if entries.iter().map(|(k, _)| k.as_str()).ne(COMPONENT_KEYS.iter().copied()) {
    return None;
  }

  let mut hex = String::from("rgba:");
  for (_, component) in entries {
    let Value::Number(n) = component else { return None };
    let byte = (n.clamp(0.0, 1.0) * 255.0).round() as u8;
    hex.push_str(&format!("{byte:02X}"));
  }
  Some(hex)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roundtrips_rgba_string() {
    let value = parse_rgba("rgba:ff0000ff").unwrap();
    let back = format_rgba(&value).unwrap();
    assert_eq!(back.to_lowercase(), "rgba:ff0000ff");
  }

  #[test]
  fn rejects_malformed_prefix() {
    assert!(parse_rgba("00ff00ff").is_err());
  }

  #[test]
  fn non_color_dict_is_not_recognized() {
    let value = Value::Dict(vec![("x".into(), Value::Number(1.0))]);
    assert!(format_rgba(&value).is_none());
  }
}
