use std::process::Command;

use color_eyre::eyre::{bail, Context};
use color_eyre::Result;
use tracing::debug;

/// Converts an iterator of &str to an  ``--Format`` argument
pub fn format_string<'a, I, S>(iter: I) -> String
where
    I: Iterator<Item = &'a S>,
    S: ?Sized + AsRef<str> + 'a,
{
    iter
        // Remove limit on field length (defaults to 20)
        .map(|v| format!("{}:0", v.as_ref()))
        .collect::<Vec<_>>()
        // Join fields by a character that does not potentially appear in values
        .join("|,")
}

/// Runs a Slurm command and returns its standard output
pub fn run(exe: &str, args: &[&str]) -> Result<Vec<u8>> {
    debug!(exe, ?args, "running command");
    let output = Command::new(exe)
        .args(args)
        .output()
        .wrap_err_with(|| format!("failed to execute {:?}", exe))?;

    if !output.status.success() {
        bail!(
            "{:?} exited with {}: {}",
            exe,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output.stdout)
}

/// Splits a comma separated list, dropping empty entries
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

/// Appends `value` unless already present, preserving the original order
pub fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_string() {
        assert_eq!(
            format_string(["JobID", "State"].iter()),
            "JobID:0|,State:0"
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a,,b, c").collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(split_list("").count(), 0);
    }

    #[test]
    fn test_push_unique() {
        let mut values = Vec::new();
        push_unique(&mut values, "b");
        push_unique(&mut values, "a");
        push_unique(&mut values, "b");
        assert_eq!(values, ["b", "a"]);
    }
}
