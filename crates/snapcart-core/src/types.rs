use serde::{Deserialize, Serialize};

/// One opaque session credential as captured from (and replayed into) the
/// browser layer. Only the three fields the storefront needs to recognise a
/// session are kept; everything else the driver reports is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub domain: String,
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Outcome signal of a single purchase-click attempt, as interpreted from
/// the resulting page state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireResult {
    /// The checkout flow reached its success indicator.
    Success,
    /// The click went through but the page does not indicate success.
    Failure,
}

impl std::fmt::Display for FireResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FireResult::Success => write!(f, "success"),
            FireResult::Failure => write!(f, "failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_json_round_trip() {
        let c = Cookie::new(".example.com", "_tb_token_", "abc123==");
        let json = serde_json::to_string(&c).unwrap();
        let back: Cookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn fire_result_wire_format() {
        let json = serde_json::to_string(&FireResult::Success).unwrap();
        assert_eq!(json, r#""success""#);
    }
}
