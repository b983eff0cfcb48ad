use serde::Serialize;

/// Real prices, already converted to the local currency, used to ground the
/// model's estimates. Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceAnchor {
    pub flight_estimate: Option<u64>,
    pub hotel_estimate: Option<u64>,
}

impl PriceAnchor {
    pub fn none() -> Self {
        Self::default()
    }
}

/// A resolved city or airport reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCode {
    pub code: String,
    pub country_code: Option<String>,
}

/// Whether the trip crosses a border, as far as the location lookup knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geography {
    Domestic,
    International,
    Unknown,
}

impl Geography {
    pub fn classify(source: Option<&LocationCode>, destination: Option<&LocationCode>) -> Self {
        let source = source.and_then(|l| l.country_code.as_deref());
        let destination = destination.and_then(|l| l.country_code.as_deref());
        match (source, destination) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => Geography::Domestic,
            (Some(_), Some(_)) => Geography::International,
            _ => Geography::Unknown,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Geography::Domestic => "domestic (same country, land journey likely possible)",
            Geography::International => "international (crosses a border)",
            Geography::Unknown => "unknown (decide from the place names)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(code: &str, country: Option<&str>) -> LocationCode {
        LocationCode {
            code: code.to_string(),
            country_code: country.map(str::to_string),
        }
    }

    #[test]
    fn test_geography_classification() {
        let bom = loc("BOM", Some("IN"));
        let jai = loc("JAI", Some("in"));
        let cdg = loc("PAR", Some("FR"));
        let unknown = loc("XXX", None);

        assert_eq!(Geography::classify(Some(&bom), Some(&jai)), Geography::Domestic);
        assert_eq!(Geography::classify(Some(&bom), Some(&cdg)), Geography::International);
        assert_eq!(Geography::classify(Some(&bom), Some(&unknown)), Geography::Unknown);
        assert_eq!(Geography::classify(None, Some(&jai)), Geography::Unknown);
    }
}
