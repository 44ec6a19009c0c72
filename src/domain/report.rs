// ============================================================
// AGE REPORT
// ============================================================
// Bucketed histogram over every stored age, computed at query time

use serde::{Deserialize, Serialize};

/// One of the four disjoint age ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBucket {
    Under20,
    From20To40,
    From40To60,
    Over60,
}

impl AgeBucket {
    pub fn for_age(age: f64) -> Self {
        if age < 20.0 {
            AgeBucket::Under20
        } else if age <= 40.0 {
            AgeBucket::From20To40
        } else if age <= 60.0 {
            AgeBucket::From40To60
        } else {
            AgeBucket::Over60
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Under20 => "<20",
            AgeBucket::From20To40 => "20-40",
            AgeBucket::From40To60 => "40-60",
            AgeBucket::Over60 => ">60",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub count: usize,
    pub pct: String,
}

impl BucketStats {
    fn new(count: usize, denominator: usize) -> Self {
        let pct = count as f64 / denominator as f64 * 100.0;
        Self {
            count,
            pct: format!("{}%", two_decimals(pct)),
        }
    }
}

/// Two-decimal rendering that rounds exact ties away from zero.
///
/// `{:.2}` rounds ties to even. A non-negative f64 sits exactly halfway between two
/// hundredths only when it is an odd multiple of 1/8 (0.125, 0.375, ...).
fn two_decimals(value: f64) -> String {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        format!("{:.2}", (value * 100.0).ceil() / 100.0)
    } else {
        format!("{:.2}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeReport {
    #[serde(rename = "<20")]
    pub under_20: BucketStats,
    #[serde(rename = "20-40")]
    pub from_20_to_40: BucketStats,
    #[serde(rename = "40-60")]
    pub from_40_to_60: BucketStats,
    #[serde(rename = ">60")]
    pub over_60: BucketStats,
    /// Number of valid ages; may be 0 even though percentages divide by at least 1.
    pub total: usize,
}

impl AgeReport {
    /// Build the report from raw ages. NaN values are discarded.
    pub fn from_ages<I>(ages: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = [0usize; 4];
        let mut total = 0usize;

        for age in ages.into_iter().filter(|a| !a.is_nan()) {
            let slot = match AgeBucket::for_age(age) {
                AgeBucket::Under20 => 0,
                AgeBucket::From20To40 => 1,
                AgeBucket::From40To60 => 2,
                AgeBucket::Over60 => 3,
            };
            counts[slot] += 1;
            total += 1;
        }

        let denominator = total.max(1);
        Self {
            under_20: BucketStats::new(counts[0], denominator),
            from_20_to_40: BucketStats::new(counts[1], denominator),
            from_40_to_60: BucketStats::new(counts[2], denominator),
            over_60: BucketStats::new(counts[3], denominator),
            total,
        }
    }

    pub fn bucket(&self, bucket: AgeBucket) -> &BucketStats {
        match bucket {
            AgeBucket::Under20 => &self.under_20,
            AgeBucket::From20To40 => &self.from_20_to_40,
            AgeBucket::From40To60 => &self.from_40_to_60,
            AgeBucket::Over60 => &self.over_60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_one_age_per_bucket() {
        let report = AgeReport::from_ages([10.0, 25.0, 45.0, 70.0]);

        for bucket in [
            AgeBucket::Under20,
            AgeBucket::From20To40,
            AgeBucket::From40To60,
            AgeBucket::Over60,
        ] {
            assert_eq!(report.bucket(bucket).count, 1, "bucket {}", bucket.label());
            assert_eq!(report.bucket(bucket).pct, "25.00%");
        }
        assert_eq!(report.total, 4);
    }

    #[test]
    fn test_no_ages_uses_denominator_one() {
        let report = AgeReport::from_ages(Vec::<f64>::new());

        assert_eq!(report.total, 0);
        assert_eq!(report.under_20, BucketStats { count: 0, pct: "0.00%".to_string() });
        assert_eq!(report.over_60.pct, "0.00%");
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgeBucket::for_age(19.0), AgeBucket::Under20);
        assert_eq!(AgeBucket::for_age(20.0), AgeBucket::From20To40);
        assert_eq!(AgeBucket::for_age(40.0), AgeBucket::From20To40);
        assert_eq!(AgeBucket::for_age(40.5), AgeBucket::From40To60);
        assert_eq!(AgeBucket::for_age(60.0), AgeBucket::From40To60);
        assert_eq!(AgeBucket::for_age(61.0), AgeBucket::Over60);
    }

    #[test]
    fn test_nan_is_discarded() {
        let report = AgeReport::from_ages([f64::NAN, 30.0, 31.0, 65.0]);

        assert_eq!(report.total, 3);
        assert_eq!(report.from_20_to_40.pct, "66.67%");
        assert_eq!(report.over_60.pct, "33.33%");
    }

    #[test]
    fn test_pct_ties_round_up() {
        let mut ages = vec![10.0];
        ages.extend(std::iter::repeat(30.0).take(799));
        let report = AgeReport::from_ages(ages);

        assert_eq!(report.under_20.pct, "0.13%");
        assert_eq!(report.from_20_to_40.pct, "99.88%");

        let mut ages = vec![10.0; 5];
        ages.extend(std::iter::repeat(30.0).take(795));
        let report = AgeReport::from_ages(ages);
        assert_eq!(report.under_20.pct, "0.63%");
        assert_eq!(report.from_20_to_40.pct, "99.38%");
    }

    #[test]
    fn test_two_decimals() {
        assert_eq!(two_decimals(0.125), "0.13");
        assert_eq!(two_decimals(12.5), "12.50");
        assert_eq!(two_decimals(66.666_666), "66.67");
        assert_eq!(two_decimals(1.0 / 3.0 * 100.0), "33.33");
        assert_eq!(two_decimals(0.0), "0.00");
    }

    #[test]
    fn test_serialized_shape() {
        let report = AgeReport::from_ages([12.0]);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "<20": { "count": 1, "pct": "100.00%" },
                "20-40": { "count": 0, "pct": "0.00%" },
                "40-60": { "count": 0, "pct": "0.00%" },
                ">60": { "count": 0, "pct": "0.00%" },
                "total": 1
            })
        );
    }
}
