//! Labelled summary metric.
//!
//! Each label set keeps a total count, a total sum, and a bounded window of
//! its most recent observations. Quantiles are computed at collect time by
//! nearest rank over that window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, LabelPair, MetricFamily, MetricType, Quantile};

/// Construction parameters for a `SummaryVec`.
#[derive(Debug, Clone)]
pub struct SummaryOpts {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub const_labels: HashMap<String, String>,
    pub percentiles: Vec<f64>,
    pub max_samples: usize,
}

#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<f64>,
    count: u64,
    sum: f64,
}

/// One label set of a summary.
#[derive(Clone)]
pub struct Summary {
    window: Arc<Mutex<Window>>,
    max_samples: usize,
}

impl Summary {
    fn new(max_samples: usize) -> Self {
        Self {
            window: Arc::new(Mutex::new(Window::default())),
            max_samples: max_samples.max(1),
        }
    }

    pub fn observe(&self, v: f64) {
        let mut w = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if w.samples.len() == self.max_samples {
            w.samples.pop_front();
        }
        w.samples.push_back(v);
        w.count += 1;
        w.sum += v;
    }

    pub fn get_sample_count(&self) -> u64 {
        self.window.lock().unwrap_or_else(PoisonError::into_inner).count
    }

    pub fn get_sample_sum(&self) -> f64 {
        self.window.lock().unwrap_or_else(PoisonError::into_inner).sum
    }

    fn snapshot(&self, percentiles: &[f64]) -> proto::Summary {
        let (count, sum, mut sorted) = {
            let w = self.window.lock().unwrap_or_else(PoisonError::into_inner);
            (w.count, w.sum, w.samples.iter().copied().collect::<Vec<_>>())
        };
        sorted.sort_by(f64::total_cmp);

        let mut out = proto::Summary::default();
        out.set_sample_count(count);
        out.set_sample_sum(sum);
        for &p in percentiles {
            let mut q = Quantile::default();
            q.set_quantile(p);
            q.set_value(nearest_rank(&sorted, p));
            out.mut_quantile().push(q);
        }
        out
    }
}

fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

struct SummaryVecCore {
    desc: Desc,
    label_names: Vec<String>,
    percentiles: Vec<f64>,
    max_samples: usize,
    children: DashMap<Vec<String>, Summary>,
}

/// Summary partitioned by label values. Cloning shares the same storage.
#[derive(Clone)]
pub struct SummaryVec {
    core: Arc<SummaryVecCore>,
}

impl SummaryVec {
    pub fn new(opts: SummaryOpts) -> prometheus::Result<Self> {
        let desc = Desc::new(
            opts.name,
            opts.help,
            opts.label_names.clone(),
            opts.const_labels,
        )?;
        Ok(Self {
            core: Arc::new(SummaryVecCore {
                desc,
                label_names: opts.label_names,
                percentiles: opts.percentiles,
                max_samples: opts.max_samples,
                children: DashMap::new(),
            }),
        })
    }

    pub fn get_metric_with_label_values(&self, values: &[&str]) -> prometheus::Result<Summary> {
        let expect = self.core.label_names.len();
        if values.len() != expect {
            return Err(prometheus::Error::InconsistentCardinality {
                expect,
                got: values.len(),
            });
        }
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let max_samples = self.core.max_samples;
        let child = self
            .core
            .children
            .entry(key)
            .or_insert_with(|| Summary::new(max_samples));
        Ok(child.value().clone())
    }

    /// Like `CounterVec::with_label_values`, panics on a label count mismatch.
    pub fn with_label_values(&self, values: &[&str]) -> Summary {
        self.get_metric_with_label_values(values)
            .unwrap_or_else(|e| panic!("summary {}: {e}", self.core.desc.fq_name))
    }

    fn metric(&self, values: &[String], child: &Summary) -> proto::Metric {
        let mut labels: Vec<LabelPair> = self.core.desc.const_label_pairs.clone();
        for (name, value) in self.core.label_names.iter().zip(values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            labels.push(pair);
        }
        labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

        let mut m = proto::Metric::default();
        for pair in labels {
            m.mut_label().push(pair);
        }
        m.set_summary(child.snapshot(&self.core.percentiles));
        m
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut children: Vec<(Vec<String>, Summary)> = self
            .core
            .children
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        let mut family = MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);
        for (values, child) in &children {
            family.mut_metric().push(self.metric(values, child));
        }
        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(labels: &[&str], max_samples: usize) -> SummaryOpts {
        SummaryOpts {
            name: "payload_bytes".into(),
            help: "Payload size".into(),
            label_names: labels.iter().map(|s| s.to_string()).collect(),
            const_labels: HashMap::new(),
            percentiles: vec![0.5, 0.9],
            max_samples,
        }
    }

    #[test]
    fn nearest_rank_quantiles() {
        let v: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(nearest_rank(&v, 0.5), 5.0);
        assert_eq!(nearest_rank(&v, 0.9), 9.0);
        assert_eq!(nearest_rank(&v, 0.999), 10.0);
        assert!(nearest_rank(&[], 0.5).is_nan());
    }

    #[test]
    fn window_is_bounded_but_totals_are_not() {
        let s = SummaryVec::new(opts(&[], 3)).unwrap();
        let child = s.with_label_values(&[]);
        for v in [100.0, 1.0, 2.0, 3.0] {
            child.observe(v);
        }
        assert_eq!(child.get_sample_count(), 4);
        assert_eq!(child.get_sample_sum(), 106.0);

        let family = &s.collect()[0];
        let quantiles = family.get_metric()[0].get_summary().get_quantile();
        assert_eq!(quantiles[1].get_value(), 3.0);
    }

    #[test]
    fn label_cardinality_is_checked() {
        let s = SummaryVec::new(opts(&["route"], 8)).unwrap();
        assert!(s.get_metric_with_label_values(&[]).is_err());
        assert!(s.get_metric_with_label_values(&["/a"]).is_ok());
    }

    #[test]
    fn clones_share_storage() {
        let s = SummaryVec::new(opts(&["route"], 8)).unwrap();
        s.clone().with_label_values(&["/a"]).observe(1.0);
        assert_eq!(s.with_label_values(&["/a"]).get_sample_count(), 1);
    }

    #[test]
    fn collect_emits_sorted_labelled_summaries() {
        let s = SummaryVec::new(opts(&["route"], 8)).unwrap();
        s.with_label_values(&["/b"]).observe(1.0);
        s.with_label_values(&["/a"]).observe(2.0);
        let family = &s.collect()[0];
        assert_eq!(family.get_field_type(), MetricType::SUMMARY);
        let routes: Vec<&str> = family
            .get_metric()
            .iter()
            .map(|m| m.get_label()[0].get_value())
            .collect();
        assert_eq!(routes, vec!["/a", "/b"]);
    }
}
