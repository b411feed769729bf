//! Dotted numeric versions as reported by system tools.
//!
//! Tool versions such as Ghostscript's `10.02.1` carry leading zeros and a
//! varying number of components, so they are compared component-wise as
//! integers, with missing trailing components treated as zero (`10.3` equals
//! `10.03.0`).

use std::{cmp::Ordering, fmt};

use super::*;

/// A version made of dot-separated unsigned integers.
#[derive(Debug, Clone)]
pub struct Version {
  /// As written
  raw:        String,
  /// Parsed numeric components
  components: Vec<u64>,
}

impl Version {
  /// The numeric components, most significant first.
  pub fn components(&self) -> &[u64] { &self.components }

  /// Components with trailing zeros dropped, so `1.0` equals `1`.
  fn normalized(&self) -> &[u64] {
    let len = self.components.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1);
    &self.components[..len]
  }
}

impl FromStr for Version {
  type Err = ProvisionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let raw = s.trim();
    let components = raw
      .split('.')
      .map(|part| part.parse::<u64>())
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| ProvisionError::InvalidVersion(s.to_owned()))?;
    Ok(Self { raw: raw.to_owned(), components })
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool { self.normalized() == other.normalized() }
}

impl Eq for Version {}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    let width = self.components.len().max(other.components.len());
    (0..width)
      .map(|i| {
        let a = self.components.get(i).copied().unwrap_or(0);
        let b = other.components.get(i).copied().unwrap_or(0);
        a.cmp(&b)
      })
      .find(|ord| ord.is_ne())
      .unwrap_or(Ordering::Equal)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> Version { s.parse().unwrap() }

  #[test]
  fn compares_numerically() {
    assert!(v("10.02.1") < v("10.03.1"));
    assert!(v("10.10.0") > v("10.9.9"));
    assert!(v("9.56.1") < v("10.0.0"));
    assert_eq!(v("10.3"), v("10.03.0"));
    assert_eq!(v("10.03.1").to_string(), "10.03.1");
  }

  #[test]
  fn rejects_garbage() {
    assert!("".parse::<Version>().is_err());
    assert!("10.x".parse::<Version>().is_err());
    assert!("GPL Ghostscript".parse::<Version>().is_err());
  }
}
