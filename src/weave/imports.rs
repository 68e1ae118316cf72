use crate::edit::Splice;
use crate::syntax::{GoFile, ImportAnchor};

/// Configured import paths the file does not import yet, in order, deduplicated.
pub fn missing_imports<'a>(file: &GoFile, required: &'a [String]) -> Vec<&'a str> {
    let mut missing: Vec<&str> = Vec::new();
    for path in required {
        if !file.imports.contains_path(path) && !missing.contains(&path.as_str()) {
            missing.push(path);
        }
    }
    missing
}

/// A splice adding `paths` at the file's import anchor.
pub fn import_splice(source: &str, anchor: ImportAnchor, paths: &[&str]) -> Option<Splice> {
    if paths.is_empty() {
        return None;
    }
    let specs: Vec<String> = paths.iter().map(|path| format!("{path:?}")).collect();

    let splice = match anchor {
        ImportAnchor::Group { close_paren } => {
            let line_start = source[..close_paren].rfind('\n').map_or(0, |i| i + 1);
            let lines: String = specs.iter().map(|spec| format!("\t{spec}\n")).collect();
            if source[line_start..close_paren].trim().is_empty() {
                Splice::insert(line_start, lines)
            } else {
                Splice::insert(close_paren, format!("\n{lines}"))
            }
        }
        ImportAnchor::After { offset } => {
            let lines: String = specs.iter().map(|spec| format!("\nimport {spec}")).collect();
            Splice::insert(offset, lines)
        }
        ImportAnchor::Package { offset } => {
            let decl = match specs.as_slice() {
                [single] => format!("\n\nimport {single}"),
                _ => {
                    let lines: String = specs.iter().map(|spec| format!("\t{spec}\n")).collect();
                    format!("\n\nimport (\n{lines})")
                }
            };
            Splice::insert(offset, decl)
        }
    };
    Some(splice)
}
