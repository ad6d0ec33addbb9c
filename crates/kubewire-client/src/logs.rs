/// Options for fetching pod logs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Container to read from, required when the pod has several
    pub container: Option<String>,
    /// Number of lines from the end of the log
    pub tail_lines: Option<i64>,
    /// Only lines newer than this many seconds; takes precedence over `tail_lines`
    pub since_seconds: Option<i64>,
    /// Prefix each line with its timestamp
    pub timestamps: bool,
}

impl LogOptions {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(container) = &self.container {
            query.push(("container", container.clone()));
        }

        // Use since_seconds if provided, otherwise use tail_lines
        match (self.since_seconds, self.tail_lines) {
            (Some(seconds), _) => query.push(("sinceSeconds", seconds.to_string())),
            (None, Some(lines)) => query.push(("tailLines", lines.to_string())),
            (None, None) => {}
        }

        if self.timestamps {
            query.push(("timestamps", "true".to_string()));
        }

        query
    }
}
