//! Output assembly: runtime prelude, wrapper, concatenation and maps.

use std::collections::BTreeMap;

use nyx_ast::{Decl, MemberKind};
use nyx_parser::ParsedSource;
use serde::Serialize;
use serde_json::Value;

use crate::issue::Issue;
use crate::options::CompilerOptions;
use crate::source_map::SourceMapBuilder;
use crate::symbols::ROOT_VARIABLE;

/// The runtime prelude, injected once by an instance without parents.
pub const RUNTIME_JS: &str = include_str!("../runtime/runtime.js");

/// Type declarations of the runtime import, for the type checker.
pub const RUNTIME_DEFS: &str = include_str!("../runtime/runtime.d.ts");

const GLOBAL_IDENTIFIER: &str = "__N$$__";

/// Per file: `(line, "Class.member")` or `(line, "function")`.
pub type FunctionMap = BTreeMap<String, Vec<(usize, String)>>;

/// Result of one `compile()` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: Option<String>,
    pub map: Option<String>,
    pub function_map: Option<FunctionMap>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    /// Token to name table of the instance's squeezer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squeezed: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridged: Option<Value>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A file's generated lines in emission order.
#[derive(Debug, Clone, Copy)]
pub struct EmittedFile<'a> {
    pub path: &'a str,
    pub lines: &'a [String],
    pub source: Option<&'a ParsedSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembled {
    pub code: String,
    pub map: Option<String>,
    pub function_map: Option<FunctionMap>,
}

/// Concatenates prepend lines, the runtime (when `include_runtime`), the
/// wrapper, every file and the append lines.
pub fn assemble(files: &[EmittedFile<'_>], options: &CompilerOptions, include_runtime: bool) -> Assembled {
    let mut prepend: Vec<String> = options.prepend().to_vec();
    if include_runtime {
        prepend.extend(RUNTIME_JS.lines().map(str::to_string));
    }
    prepend.push("(function() { \"use strict\";".to_string());
    prepend.push(format!(
        "const {} = globalThis[Symbol.for(\"{}\")];",
        ROOT_VARIABLE, GLOBAL_IDENTIFIER
    ));

    let mut append = vec!["})();".to_string()];
    append.extend(options.append().iter().cloned());

    let map = options.include_map().then(|| {
        let mut builder = SourceMapBuilder::new();
        builder.add_unmapped(prepend.len());
        for file in files {
            builder.add_file(file.path, file.lines.len());
        }
        builder.add_unmapped(append.len());
        builder.to_json(options.source_map_file(), options.source_map_root())
    });

    let function_map = options.include_function_map().then(|| {
        files
            .iter()
            .filter_map(|file| file.source.map(|source| (file.path.to_string(), function_map(source))))
            .collect()
    });

    let mut lines: Vec<&str> = prepend.iter().map(String::as_str).collect();
    for file in files {
        lines.extend(file.lines.iter().map(String::as_str));
    }
    lines.extend(append.iter().map(String::as_str));

    Assembled {
        code: lines.join("\n"),
        map,
        function_map,
    }
}

/// Lines of the functions and class members declared at the top level.
pub fn function_map(source: &ParsedSource) -> Vec<(usize, String)> {
    let mut entries = Vec::new();

    for decl in source.program.declarations() {
        match &decl.value {
            Decl::Function(function) => {
                entries.push((
                    source.line_of(function.name.span.start),
                    function.name.value.name.clone(),
                ));
            }
            Decl::Class(class) => {
                for member in class.members.iter().filter(|m| m.kind != MemberKind::Field) {
                    entries.push((
                        source.line_of(member.span.start),
                        format!("{}.{}", class.name.value.name, member.name.value.name),
                    ));
                }
            }
            Decl::Var(_) => {}
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RawOptions;

    fn options(raw: RawOptions) -> CompilerOptions {
        CompilerOptions::new(&raw).unwrap()
    }

    #[test]
    fn test_wrapper_and_order() {
        let a = vec!["let a;".to_string()];
        let b = vec!["let b;".to_string(), "b();".to_string()];
        let files = [
            EmittedFile { path: "a.nx", lines: &a, source: None },
            EmittedFile { path: "b.nx", lines: &b, source: None },
        ];

        let options = options(RawOptions::new().set("prepend", "// head").set("append", vec!["// tail"]));
        let assembled = assemble(&files, &options, false);

        assert_eq!(
            assembled.code,
            "// head\n(function() { \"use strict\";\nconst N$$_ = globalThis[Symbol.for(\"__N$$__\")];\nlet a;\nlet b;\nb();\n})();\n// tail"
        );
        assert!(assembled.map.is_none());
        assert!(assembled.function_map.is_none());
    }

    #[test]
    fn test_runtime_after_prepend() {
        let options = options(RawOptions::new().set("prepend", "// head"));
        let assembled = assemble(&[], &options, true);
        let runtime_start = assembled.code.find("dispatchInit").unwrap();
        assert!(assembled.code.starts_with("// head\n"));
        assert!(runtime_start < assembled.code.find("const N$$_").unwrap());
    }

    #[test]
    fn test_source_map_skips_prepend() {
        let a = vec!["x;".to_string(), "y;".to_string()];
        let files = [EmittedFile { path: "a.nx", lines: &a, source: None }];
        let options = options(RawOptions::new().set("include-map", true).set("prepend", "p"));

        let map: Value = serde_json::from_str(&assemble(&files, &options, false).map.unwrap()).unwrap();
        assert_eq!(map["sources"], serde_json::json!(["a.nx"]));
        // prepend, wrapper open, root variable, two file lines, wrapper close
        assert_eq!(map["mappings"], ";;;AAAA;AACA;");
    }

    #[test]
    fn test_function_map() {
        let source = nyx_parser::parse(
            "export class A {\n  constructor() {}\n  count = 0;\n  get size() { return 1; }\n}\nfunction helper() {}",
        )
        .unwrap();
        assert_eq!(
            function_map(&source),
            vec![
                (2, "A.constructor".to_string()),
                (4, "A.size".to_string()),
                (6, "helper".to_string()),
            ]
        );
    }

    #[test]
    fn test_output_json_shape() {
        let output = CompileOutput {
            code: Some("x".to_string()),
            ..CompileOutput::default()
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            serde_json::json!({ "code": "x", "map": null, "functionMap": null, "errors": [], "warnings": [] })
        );
    }
}
