// src/features/series.rs
//
// Per-host, per-second dense binning of responder bytes. Instead of
// grouping-and-resampling with a dataframe, this (i) groups flow samples
// by originator address into per-host vectors, (ii) buckets each sample by
// its integer second offset from `t0`, (iii) sums into a pre-allocated
// dense `Vec<f64>` of length `window_secs`. No dataframe dependency, and
// one linear pass over the input.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{FlowSample, HostBins};

/// Build one dense bin vector per host over `[t0, t1)`, zero-filling seconds
/// with no traffic. `window_secs` must equal `floor(t1 - t0)` in seconds —
/// the caller (scheduler) derives it once and passes it through so every
/// host's series has identical, comparable length.
pub fn bin_by_host(
    samples: &[FlowSample],
    t0: DateTime<Utc>,
    window_secs: i64,
) -> HostBins {
    let window_secs = window_secs.max(0) as usize;
    let mut bins: HashMap<String, Vec<f64>> = HashMap::new();

    for sample in samples {
        let offset = (sample.ts - t0).num_seconds();
        if offset < 0 || offset as usize >= window_secs {
            continue;
        }
        let entry = bins
            .entry(sample.host.clone())
            .or_insert_with(|| vec![0.0; window_secs]);
        entry[offset as usize] += sample.resp_bytes as f64;
    }

    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(host: &str, secs_offset: i64, bytes: i64, t0: DateTime<Utc>) -> FlowSample {
        FlowSample {
            host: host.to_string(),
            ts: t0 + chrono::Duration::seconds(secs_offset),
            resp_bytes: bytes,
        }
    }

    #[test]
    fn zero_fills_missing_seconds() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = vec![sample("10.0.0.1", 0, 100, t0), sample("10.0.0.1", 5, 50, t0)];
        let bins = bin_by_host(&samples, t0, 10);
        let v = &bins["10.0.0.1"];
        assert_eq!(v.len(), 10);
        assert_eq!(v[0], 100.0);
        assert_eq!(v[5], 50.0);
        assert_eq!(v[1], 0.0);
    }

    #[test]
    fn sums_multiple_samples_in_same_second() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = vec![sample("h", 2, 10, t0), sample("h", 2, 20, t0)];
        let bins = bin_by_host(&samples, t0, 5);
        assert_eq!(bins["h"][2], 30.0);
    }

    #[test]
    fn drops_samples_outside_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = vec![sample("h", -1, 10, t0), sample("h", 20, 10, t0)];
        let bins = bin_by_host(&samples, t0, 10);
        assert!(!bins.contains_key("h"));
    }

    #[test]
    fn partitions_by_host() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let samples = vec![sample("a", 0, 5, t0), sample("b", 0, 7, t0)];
        let bins = bin_by_host(&samples, t0, 3);
        assert_eq!(bins["a"][0], 5.0);
        assert_eq!(bins["b"][0], 7.0);
    }
}
