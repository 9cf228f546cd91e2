use crate::{customer::HappyCallWindow, types::Days};
use serde::{Deserialize, Serialize};

/// A half-open day range `[from_days, until_days)` after the last completed
/// inspection during which a happy call is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HappyCallRule {
    pub window:     HappyCallWindow,
    pub from_days:  Days,
    pub until_days: Days,
}

impl HappyCallRule {
    pub fn contains(&self, days_since: Days) -> bool {
        self.from_days <= days_since && days_since < self.until_days
    }
}

/// Thresholds for classification, tagging and happy-call windowing.
/// `Default` is the production rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRules {
    /// Statutory inspection interval; actual inspection = expiry − this.
    pub inspection_interval_days:    Days,
    /// Expiry within this many days of the reference date counts as due soon.
    pub due_soon_days:               Days,
    /// Days past expiry after which a customer is considered lost.
    pub lost_after_days:             Days,
    /// Days past expiry after which the vehicle is presumed scrapped.
    pub scrapped_after_days:         Days,
    pub frequent_visitor_min_visits: i64,
    /// Evaluated in order; the first matching rule wins.
    pub happy_call_windows:          Vec<HappyCallRule>,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            inspection_interval_days:    730,
            due_soon_days:               90,
            lost_after_days:             730,
            scrapped_after_days:         1460,
            frequent_visitor_min_visits: 3,
            happy_call_windows: vec![
                HappyCallRule { window: HappyCallWindow::ThreeMonth,    from_days: 90,  until_days: 180 },
                HappyCallRule { window: HappyCallWindow::SixMonth,      from_days: 180, until_days: 365 },
                HappyCallRule { window: HappyCallWindow::TwelveMonth,   from_days: 365, until_days: 540 },
                HappyCallRule { window: HappyCallWindow::EighteenMonth, from_days: 540, until_days: 730 },
            ],
        }
    }
}

impl LifecycleRules {
    /// Reject rule sets that would break the status partition or let two
    /// happy-call windows overlap.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lost_after_days >= self.scrapped_after_days {
            anyhow::bail!(
                "lost_after_days ({}) must be below scrapped_after_days ({})",
                self.lost_after_days,
                self.scrapped_after_days
            );
        }
        if self.inspection_interval_days < 0 || self.due_soon_days < 0 {
            anyhow::bail!("day intervals must be non-negative");
        }
        for rule in &self.happy_call_windows {
            if rule.from_days >= rule.until_days {
                anyhow::bail!("happy-call window {} is empty", rule.window.as_str());
            }
        }
        for pair in self.happy_call_windows.windows(2) {
            if pair[0].until_days > pair[1].from_days {
                anyhow::bail!(
                    "happy-call windows {} and {} overlap",
                    pair[0].window.as_str(),
                    pair[1].window.as_str()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows committed per transaction.
    pub batch_size:      usize,
    /// Emit a progress log line every this many rows.
    pub progress_every:  usize,
    /// Recorded as the uploader on upload history rows.
    pub uploaded_by:     String,
    /// How many row errors to keep verbatim in the report.
    pub max_reported_errors: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size:          500,
            progress_every:      1000,
            uploaded_by:         "admin".into(),
            max_reported_errors: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    pub rules:  LifecycleRules,
    pub import: ImportConfig,
}

impl CrmConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CrmConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.rules.validate()?;
        Ok(config)
    }

    /// Defaults with small batches so tests cross batch boundaries.
    pub fn default_test() -> Self {
        Self {
            rules:  LifecycleRules::default(),
            import: ImportConfig {
                batch_size:     3,
                progress_every: 2,
                ..ImportConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_are_valid() {
        LifecycleRules::default().validate().unwrap();
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        let mut rules = LifecycleRules::default();
        rules.happy_call_windows[1].from_days = 150;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CrmConfig =
            serde_json::from_str(r#"{ "rules": { "due_soon_days": 60 } }"#).unwrap();
        assert_eq!(config.rules.due_soon_days, 60);
        assert_eq!(config.rules.scrapped_after_days, 1460);
        assert_eq!(config.import.batch_size, 500);
    }

    #[test]
    fn happy_call_rule_is_half_open() {
        let rule = &LifecycleRules::default().happy_call_windows[0];
        assert!(!rule.contains(89));
        assert!(rule.contains(90));
        assert!(rule.contains(179));
        assert!(!rule.contains(180));
    }
}
