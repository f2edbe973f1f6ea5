pub mod emails;
pub mod health;
pub mod stats;
pub mod tracking;

/// `?from=&to=` query parameters shared by the stats and summary endpoints.
///
/// Extracted from raw key/value pairs so a repeated key never rejects the
/// request; the first occurrence wins.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RangeParams {
  pub from: Option<String>,
  pub to:   Option<String>,
}

impl RangeParams {
  pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
    let mut params = Self::default();
    for (key, value) in pairs {
      let slot = match key.as_str() {
        "from" => &mut params.from,
        "to" => &mut params.to,
        _ => continue,
      };
      slot.get_or_insert(value);
    }
    params
  }

  /// Bounds with empty strings treated as absent.
  pub(super) fn bounds(&self) -> (Option<&str>, Option<&str>) {
    fn present(v: &Option<String>) -> Option<&str> { v.as_deref().filter(|s| !s.is_empty()) }
    (present(&self.from), present(&self.to))
  }
}
