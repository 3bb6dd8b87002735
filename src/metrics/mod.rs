//! Metric vocabulary and the per-target metric set.
//!
//! Every scrape produces a [`MetricSet`] keyed by [`MetricName`]. The set may
//! be partial: a target whose grading or evaluation analysis failed simply
//! has no `score`/`grade`/`ssl_level` entry.
//!
//! # Submodules
//!
//! - `prom` - Prometheus exposition of cached metric sets

use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub mod prom;

/// The fixed set of metrics exported per target.
///
/// Variants are declared in alphabetical order of their exported names, so
/// the derived `Ord` is the sorted key order used when exporting.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum MetricName {
    CertExpiryDate,
    CertIsTrusted,
    CertStartDate,
    Grade,
    Score,
    SslLevel,
    TlsEnabled,
}

impl MetricName {
    pub fn help(&self) -> &'static str {
        match self {
            MetricName::CertExpiryDate => "Expiry date for certificate.",
            MetricName::CertIsTrusted => {
                "Is 1 (aka 'trusted') if certificate is known to be trusted (via truststores)"
            }
            MetricName::CertStartDate => "Start date for certificate.",
            MetricName::Grade => "Grade representation of score, A=4, B=3, C=2, D=1, F=0",
            MetricName::Score => {
                "Defines the score given by Mozilla Observatory's mozillaGradingWorker (0...100)"
            }
            MetricName::SslLevel => {
                "Defines the Mozilla SSL compatibility level for given domain (bad=0, non-compliant=1, old=2, intermediate=3, modern=4)"
            }
            MetricName::TlsEnabled => "TLS enabled for domain",
        }
    }
}

/// Latest findings for one target.
///
/// Immutable once built; the cache replaces a target's set wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    values: BTreeMap<MetricName, f64>,
}

impl MetricSet {
    pub fn get(&self, name: MetricName) -> Option<f64> {
        self.values.get(&name).copied()
    }

    pub fn contains(&self, name: MetricName) -> bool {
        self.values.contains_key(&name)
    }

    /// Iterates the present metrics in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(MetricName, f64)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (MetricName, f64)>>(iter: I) -> Self {
        MetricSet {
            values: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(MetricName, f64); N]> for MetricSet {
    fn from(values: [(MetricName, f64); N]) -> Self {
        values.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_metric_names() {
        let name: &str = MetricName::CertExpiryDate.as_ref();
        assert_eq!(name, "cert_expiry_date");
        assert_eq!(MetricName::SslLevel.to_string(), "ssl_level");
        assert_eq!(MetricName::from_str("tls_enabled"), Ok(MetricName::TlsEnabled));
        assert!(MetricName::from_str("is_valid").is_err());
    }

    #[test]
    fn test_enum_order_matches_name_order() {
        let names: Vec<String> = MetricName::iter().map(|n| n.to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_metric_set_iterates_sorted() {
        let set = MetricSet::from([
            (MetricName::TlsEnabled, 1.0),
            (MetricName::Score, 85.0),
            (MetricName::CertIsTrusted, 0.0),
        ]);

        let keys: Vec<MetricName> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(
            keys,
            vec![
                MetricName::CertIsTrusted,
                MetricName::Score,
                MetricName::TlsEnabled
            ]
        );
        assert_eq!(set.get(MetricName::Score), Some(85.0));
        assert!(!set.contains(MetricName::Grade));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_every_metric_has_help() {
        for name in MetricName::iter() {
            assert!(!name.help().is_empty());
        }
    }
}
