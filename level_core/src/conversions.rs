//! `From` implementations bridging `level_config` types to `level_core` types.

use crate::config::{ReadCfg, ReadPolicy, SamplingCfg};
use crate::record::CycleRecord;

impl From<&level_config::SamplingCfg> for SamplingCfg {
    fn from(c: &level_config::SamplingCfg) -> Self {
        Self {
            period_ms: c.period_ms,
            samples_avg: c.samples_avg,
            settle_us: c.settle_us,
            baseline: c.baseline,
        }
    }
}

impl From<&level_config::ReadCfg> for ReadCfg {
    fn from(c: &level_config::ReadCfg) -> Self {
        let policy = match c.policy {
            level_config::ReadPolicyKind::Skip => ReadPolicy::Skip,
            level_config::ReadPolicyKind::Retry => ReadPolicy::Retry {
                max_attempts: c.max_attempts,
            },
            level_config::ReadPolicyKind::Stale => ReadPolicy::Stale,
        };
        Self {
            policy,
            timeout_ms: c.timeout_ms,
            max_consecutive_skips: c.max_consecutive_skips,
        }
    }
}

impl From<&level_config::CaptureRow> for CycleRecord {
    fn from(r: &level_config::CaptureRow) -> Self {
        Self {
            timestamp_us: r.t_us,
            raw: r.raw,
            level: r.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_carries_attempts() {
        let cfg = level_config::ReadCfg {
            policy: level_config::ReadPolicyKind::Retry,
            max_attempts: 4,
            timeout_ms: 9,
            max_consecutive_skips: 2,
        };
        let core: ReadCfg = (&cfg).into();
        assert_eq!(core.policy, ReadPolicy::Retry { max_attempts: 4 });
        assert_eq!(core.timeout_ms, 9);
        assert_eq!(core.max_consecutive_skips, 2);
    }

    #[test]
    fn sampling_defaults_agree_across_crates() {
        let core: SamplingCfg = (&level_config::SamplingCfg::default()).into();
        assert_eq!(core, SamplingCfg::default());
    }
}
