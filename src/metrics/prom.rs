use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use strum::IntoEnumIterator;

use crate::cache::Cache;
use crate::metrics::MetricName;
use crate::Target;

pub const NAMESPACE: &str = "observatory";
const TARGET_LABEL: &str = "target";

/// One value exposed on a pull, labeled by its target.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub target: Target,
    pub metric: MetricName,
    pub value: f64,
}

/// Exposes the cached metric sets as `observatory_*` gauges.
///
/// Every pull only reads the cache; it never waits on a scrape. Pulls are
/// serialized because they share the gauge vectors.
pub struct Exporter {
    cache: Arc<Cache>,
    gauges: BTreeMap<MetricName, GaugeVec>,
    pull: Mutex<()>,
}

impl Exporter {
    pub fn new(cache: Arc<Cache>) -> prometheus::Result<Self> {
        let mut gauges = BTreeMap::new();
        for name in MetricName::iter() {
            let opts = Opts::new(name.to_string(), name.help()).namespace(NAMESPACE);
            gauges.insert(name, GaugeVec::new(opts, &[TARGET_LABEL])?);
        }

        Ok(Exporter {
            cache,
            gauges,
            pull: Mutex::new(()),
        })
    }

    /// Current samples: targets in sorted order, then metrics in sorted
    /// order within each target. Absent metrics produce no sample.
    pub fn samples(&self) -> Vec<Sample> {
        self.cache
            .read_all()
            .into_iter()
            .flat_map(|(target, metrics)| {
                metrics
                    .iter()
                    .map(|(metric, value)| Sample {
                        target: target.clone(),
                        metric,
                        value,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl Collector for Exporter {
    fn desc(&self) -> Vec<&Desc> {
        self.gauges.values().flat_map(|gauge| gauge.desc()).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _pull = self.pull.lock().unwrap_or_else(PoisonError::into_inner);

        for gauge in self.gauges.values() {
            gauge.reset();
        }
        for sample in self.samples() {
            if let Some(gauge) = self.gauges.get(&sample.metric) {
                gauge
                    .with_label_values(&[sample.target.as_str()])
                    .set(sample.value);
            }
        }

        self.gauges.values().flat_map(|gauge| gauge.collect()).collect()
    }
}

/// Gauge fixed at 1, labeled with the crate version.
pub fn build_info() -> prometheus::Result<GaugeVec> {
    let opts = Opts::new(
        "build_info",
        "A metric with a constant '1' value labeled by the version of observatory-exporter.",
    )
    .namespace("observatory_exporter");
    let gauge = GaugeVec::new(opts, &["version"])?;
    gauge
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);
    Ok(gauge)
}

/// Builds the registry served on the pull endpoint.
pub fn metrics_registry(exporter: Exporter) -> prometheus::Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(exporter))?;
    registry.register(Box::new(build_info()?))?;

    #[cfg(target_os = "linux")]
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;

    Ok(registry)
}
