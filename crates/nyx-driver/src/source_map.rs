//! Line-granularity Source Map v3 output

use rustc_hash::FxHashMap;
use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_root: Option<&'a str>,
    sources: &'a [String],
    names: [&'a str; 0],
    mappings: String,
}

/// Maps each output line to a source file and line. Output lines that do
/// not come from a source file stay unmapped.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    source_index: FxHashMap<String, usize>,
    /// Per output line: source index and 0-based source line
    lines: Vec<Option<(usize, usize)>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unmapped(&mut self, count: usize) {
        self.lines.extend(std::iter::repeat(None).take(count));
    }

    /// Adds `count` lines generated line for line from `path`.
    pub fn add_file(&mut self, path: &str, count: usize) {
        let index = match self.source_index.get(path) {
            Some(index) => *index,
            None => {
                let index = self.sources.len();
                self.sources.push(path.to_string());
                self.source_index.insert(path.to_string(), index);
                index
            }
        };
        self.lines.extend((0..count).map(|line| Some((index, line))));
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The `mappings` field: one segment at column 0 per mapped line.
    pub fn mappings(&self) -> String {
        let mut result = String::new();
        let mut previous_source = 0i64;
        let mut previous_line = 0i64;

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                result.push(';');
            }
            let Some((source, source_line)) = *line else {
                continue;
            };

            let (source, source_line) = (source as i64, source_line as i64);
            encode_vlq(0, &mut result);
            encode_vlq(source - previous_source, &mut result);
            encode_vlq(source_line - previous_line, &mut result);
            encode_vlq(0, &mut result);

            previous_source = source;
            previous_line = source_line;
        }

        result
    }

    pub fn to_json(&self, file: Option<&str>, source_root: Option<&str>) -> String {
        let json = SourceMapJson {
            version: 3,
            file,
            source_root,
            sources: &self.sources,
            names: [],
            mappings: self.mappings(),
        };
        serde_json::to_string(&json).unwrap_or_default()
    }
}

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = vlq & 0b11111;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn test_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn test_mappings() {
        let mut builder = SourceMapBuilder::new();
        builder.add_unmapped(1);
        builder.add_file("a.nx", 2);
        builder.add_file("b.nx", 1);
        builder.add_unmapped(1);

        assert_eq!(builder.line_count(), 5);
        assert_eq!(builder.mappings(), ";AAAA;AACA;ACDA;");
    }

    #[test]
    fn test_json() {
        let mut builder = SourceMapBuilder::new();
        builder.add_file("a.nx", 1);
        let json: serde_json::Value = serde_json::from_str(&builder.to_json(Some("out.js"), None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "version": 3,
                "file": "out.js",
                "sources": ["a.nx"],
                "names": [],
                "mappings": "AAAA"
            })
        );
    }
}
