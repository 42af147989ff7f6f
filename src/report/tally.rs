use crate::slurm::split_list;

use super::condense::condense_label;

/// Number of nodes carrying each tag of a comma separated list, such as GRES or features.
/// Tags are kept in the order in which they were first seen.
#[derive(Clone, Debug, Default)]
pub struct ResourceTally {
    entries: Vec<(String, u64)>,
}

impl ResourceTally {
    /// Counts every tag in the comma separated list of a single node
    pub fn add(&mut self, tags: &str) {
        for tag in split_list(tags) {
            match self.entries.iter_mut().find(|(name, _)| name == tag) {
                Some((_, count)) => *count += 1,
                None => self.entries.push((tag.to_string(), 1)),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Renders the tally as `name(count),...`, or `-` if nothing was counted
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }

        self.iter()
            .map(|(name, count)| format!("{}({})", name, condense_label(count)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_nodes_per_tag() {
        let mut tally = ResourceTally::default();
        tally.add("gpu:a100:4,nvme");
        tally.add("gpu:a100:4");
        tally.add("");
        tally.add("ib");

        assert_eq!(
            tally.iter().collect::<Vec<_>>(),
            [("gpu:a100:4", 2), ("nvme", 1), ("ib", 1)]
        );
        assert_eq!(tally.summary(), "gpu:a100:4(2),nvme(1),ib(1)");
    }

    #[test]
    fn test_empty_tally() {
        let mut tally = ResourceTally::default();
        assert_eq!(tally.summary(), "-");

        tally.add("");
        assert!(tally.is_empty());

        tally.add("avx2");
        assert!(!tally.is_empty());
        assert_eq!(tally.summary(), "avx2(1)");
    }

    #[test]
    fn test_tally_condenses_large_counts() {
        let mut tally = ResourceTally::default();
        for _ in 0..12_345 {
            tally.add("cpu");
        }

        assert_eq!(tally.summary(), "cpu(12k)");
    }
}
