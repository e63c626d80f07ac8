// Diagnostic response sink
//
// Writes every successful response body to `<dir>/<path>.json`, with `/`
// and `.` in the request path replaced by `_`. Files are overwritten on
// every call; failures propagate to the caller.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::error::Error;

/// Writes response bodies to a directory, one file per request path.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    dir: PathBuf,
}

impl ResponseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the response for `path` is written to.
    pub fn file_for(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(path)))
    }

    /// Persist `body` as 4-space indented JSON with sorted keys.
    ///
    /// Empty bodies (`null`, `{}`, `[]`) are not written. The directory is
    /// created if missing (one level only; the parent must exist).
    pub fn save(&self, path: &str, body: &Value) -> Result<Option<PathBuf>, Error> {
        if is_empty(body) {
            return Ok(None);
        }

        if !self.dir.is_dir() {
            fs::create_dir(&self.dir)?;
        }

        let file = self.file_for(path);
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        SortedKeys(body)
            .serialize(&mut ser)
            .map_err(|e| Error::Io(e.into()))?;

        let mut out = fs::File::create(&file)?;
        out.write_all(&buf)?;
        debug!(file = %file.display(), "saved response");
        Ok(Some(file))
    }
}

/// `a/b.c` → `a_b_c`.
fn file_stem(path: &str) -> String {
    path.replace(['/', '.'], "_")
}

fn is_empty(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Serializes a JSON value with object keys in lexicographic order,
/// regardless of how `serde_json::Map` orders them.
struct SortedKeys<'a>(&'a Value);

impl Serialize for SortedKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k, SortedKeys(v)))
                .collect::<BTreeMap<_, _>>()
                .serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(SortedKeys)),
            other => other.serialize(serializer),
        }
    }
}
