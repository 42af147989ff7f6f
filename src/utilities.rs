use std::collections::HashMap;
use std::str::FromStr;

/// Splits `haystack` at the first occurrence of `needle`, returning None if no needle was found
pub fn split_first(haystack: &[u8], needle: u8) -> Option<(&[u8], &[u8])> {
    if let Some((index, _)) = haystack.iter().enumerate().find(|(_, &c)| c == needle) {
        let (key, haystack) = haystack.split_at(index);

        Some((key, &haystack[1..]))
    } else {
        None
    }
}

/// `Key=Value` pairs of a single line of `scontrol show <entity> --oneline` output
#[derive(Debug, Default)]
pub struct Fields<'a> {
    values: HashMap<&'a [u8], &'a [u8]>,
}

impl<'a> Fields<'a> {
    /// Splits a line into whitespace separated `Key=Value` pairs. Words without a `=` are
    /// treated as the continuation of the previous value, since free-text values such as
    /// `Reason=Not responding [slurm@...]` are printed without quoting.
    pub fn parse(line: &'a [u8]) -> Self {
        let mut values = HashMap::new();
        let mut last: Option<(&'a [u8], usize)> = None;

        let mut start = 0;
        while start < line.len() {
            if line[start].is_ascii_whitespace() {
                start += 1;
                continue;
            }

            let end = line[start..]
                .iter()
                .position(|c| c.is_ascii_whitespace())
                .map_or(line.len(), |offset| start + offset);

            let word = &line[start..end];
            match split_first(word, b'=') {
                Some((key, value)) => {
                    values.insert(key, value);
                    last = Some((key, end - value.len()));
                }
                None => {
                    if let Some((key, value_start)) = last {
                        values.insert(key, &line[value_start..end]);
                    }
                }
            }

            start = end;
        }

        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value of `key` as UTF-8, if present
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.values
            .get(key.as_bytes())
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Returns the value of `key`, treating Slurm's placeholders for missing values as absent
    pub fn text(&self, key: &str) -> Option<&'a str> {
        self.get(key)
            .filter(|value| !matches!(*value, "" | "(null)" | "N/A" | "n/a"))
    }

    /// Parses the value of `key`, returning None if missing or invalid
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Option<T> {
        self.text(key).and_then(|value| value.parse().ok())
    }
}
