//! Query-parameter canonicalization for `list_mods` (§4.8, §9 Open
//! Questions): sort keys and drop empty values so cache keys collapse
//! across equivalent requests. The exact table (which keys are recognized,
//! how list-valued params render) is recorded as an Open Question decision
//! in DESIGN.md.

/// Canonicalizes `params` into a sorted, empty-value-free query string
/// (without a leading `?`).
pub fn canonicalize(params: &[(&str, &str)]) -> String {
  let mut pairs: Vec<(&str, &str)> = params.iter().copied().filter(|(_, v)| !v.is_empty()).collect();
  pairs.sort_by_key(|(k, _)| *k);

  pairs
    .into_iter()
    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sorts_keys_and_drops_empty_values() {
    let canonical = canonicalize(&[("version", ""), ("namelist", "a,b"), ("hide_deprecated", "true")]);
    assert_eq!(canonical, "hide_deprecated=true&namelist=a%2Cb");
  }

  #[test]
  fn equivalent_param_orders_produce_identical_strings() {
    let a = canonicalize(&[("b", "2"), ("a", "1")]);
    let b = canonicalize(&[("a", "1"), ("b", "2")]);
    assert_eq!(a, b);
  }
}
