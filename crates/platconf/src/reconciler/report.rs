use std::fmt;

use serde::Serialize;

use crate::backend::Outcome;

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub created: usize,
    pub replaced: usize,
    pub merged: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub absent: usize,
    pub executed: usize,
    pub uploaded: usize,
}

impl RunReport {
    pub fn record(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Created => &mut self.created,
            Outcome::Replaced => &mut self.replaced,
            Outcome::Merged => &mut self.merged,
            Outcome::Unchanged => &mut self.unchanged,
            Outcome::Deleted => &mut self.deleted,
            Outcome::Absent => &mut self.absent,
            Outcome::Executed => &mut self.executed,
            Outcome::Uploaded => &mut self.uploaded,
        };
        *counter += 1;
    }

    pub fn total(&self) -> usize {
        self.counts().iter().map(|(_, count)| count).sum()
    }

    fn counts(&self) -> [(&'static str, usize); 8] {
        [
            ("created", self.created),
            ("replaced", self.replaced),
            ("merged", self.merged),
            ("unchanged", self.unchanged),
            ("deleted", self.deleted),
            ("absent", self.absent),
            ("executed", self.executed),
            ("uploaded", self.uploaded),
        ]
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, count)| format!("{} {}", count, name))
            .collect();

        if parts.is_empty() {
            write!(f, "nothing to do")
        } else {
            write!(f, "{} item(s): {}", self.total(), parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_display() {
        let mut report = RunReport::default();
        report.record(Outcome::Created);
        report.record(Outcome::Created);
        report.record(Outcome::Unchanged);
        assert_eq!(report.total(), 3);
        assert_eq!(report.to_string(), "3 item(s): 2 created, 1 unchanged");
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(RunReport::default().to_string(), "nothing to do");
    }
}
