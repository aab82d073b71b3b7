//! Parser for `.ffi` signature files.
//!
//! # File Format
//!
//! ```text
//! # Comment lines start with #
//!
//! # name: (params) -> outputs
//! dot: (vec<real> x[n], vec<real> y[n], int n = len(x)) -> real
//! transpose: (mat<real> a) -> mat<real>[cols(a), rows(a)]
//! minmax: (vec<int> v) -> (int, int)
//! reset: (vec<real> buf) -> void
//! ```
//!
//! # Types
//!
//! - `bool`, `int`, `real`, `complex` - scalars (`f64`, `double` and `i64` are accepted aliases)
//! - `vec<kind>` - vector of a kind
//! - `mat<kind>` - row-major matrix of a kind
//!
//! A parameter may declare the sizes it must have (`x[n]`, `a[m, n]`) and a
//! size parameter may declare how it is derived (`int n = len(x)`). Derived
//! parameters can be omitted by the caller.

use crate::types::{is_ident, CallSignature, Output, Param, ParamType, SizeExpr};
use std::collections::HashMap;
use std::path::Path;

/// A collection of parsed function signatures for a library.
#[derive(Debug, Clone, Default)]
pub struct SignatureFile {
    /// Function signatures indexed by name
    pub signatures: HashMap<String, CallSignature>,
}

impl SignatureFile {
    pub fn new() -> Self {
        Self {
            signatures: HashMap::new(),
        }
    }

    /// Parse a `.ffi` file from a path.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ParseError {
            line: 0,
            message: format!("Failed to read '{}': {}", path.as_ref().display(), e),
        })?;
        Self::parse(&content)
    }

    /// Parse `.ffi` content from a string.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut signatures = HashMap::new();

        for (line_num, line) in content.lines().enumerate() {
            let line_num = line_num + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sig = parse_signature_line(line, line_num)?;
            if signatures.contains_key(&sig.name) {
                return Err(ParseError {
                    line: line_num,
                    message: format!("Duplicate signature for '{}'", sig.name),
                });
            }
            signatures.insert(sig.name.clone(), sig);
        }

        Ok(Self { signatures })
    }

    pub fn get(&self, name: &str) -> Option<&CallSignature> {
        self.signatures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signatures.contains_key(name)
    }

    pub fn insert(&mut self, sig: CallSignature) {
        self.signatures.insert(sig.name.clone(), sig);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallSignature> {
        self.signatures.values()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Error during signature file parsing.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a single signature line: `name: (params) -> outputs`
pub fn parse_signature_line(line: &str, line_num: usize) -> Result<CallSignature, ParseError> {
    let err = |message: String| ParseError {
        line: line_num,
        message,
    };

    let colon_pos = line
        .find(':')
        .ok_or_else(|| err("Expected ':' after function name".to_string()))?;

    let name = line[..colon_pos].trim().to_string();
    if name.is_empty() {
        return Err(err("Function name cannot be empty".to_string()));
    }
    if !is_ident(&name) {
        return Err(err(format!("Invalid function name '{name}'")));
    }

    let (params, outputs) = parse_type_signature(line[colon_pos + 1..].trim(), line_num)?;

    let sig = CallSignature::new(name, params, outputs);
    sig.validate().map_err(err)?;
    Ok(sig)
}

/// Parse `(params) -> outputs`
fn parse_type_signature(s: &str, line_num: usize) -> Result<(Vec<Param>, Vec<Output>), ParseError> {
    let err = |message: &str| ParseError {
        line: line_num,
        message: message.to_string(),
    };

    if !s.starts_with('(') {
        return Err(err("Expected '(' at start of type signature"));
    }

    let close_paren =
        find_matching(s, 0, '(', ')').ok_or_else(|| err("Unmatched '(' in type signature"))?;

    let params_str = &s[1..close_paren];
    let rest = s[close_paren + 1..].trim();

    let outputs_str = rest
        .strip_prefix("->")
        .ok_or_else(|| err("Expected '->' after parameter list"))?
        .trim();

    let params = split_top_level(params_str)
        .into_iter()
        .map(|p| parse_param(p, line_num))
        .collect::<Result<Vec<_>, _>>()?;

    let outputs = parse_outputs(outputs_str, line_num)?;

    Ok((params, outputs))
}

/// Parse `type ident [dims] [= size]`.
fn parse_param(s: &str, line_num: usize) -> Result<Param, ParseError> {
    let err = |message: String| ParseError {
        line: line_num,
        message,
    };

    let (ty, rest) = split_type(s).ok_or_else(|| err(format!("Unknown parameter type in '{s}'")))?;

    let (decl, derived) = match rest.split_once('=') {
        Some((decl, expr)) => {
            let expr = SizeExpr::parse(expr)
                .ok_or_else(|| err(format!("Invalid size expression '{}'", expr.trim())))?;
            (decl.trim(), Some(expr))
        }
        None => (rest.trim(), None),
    };

    let (name, dims) = match decl.find('[') {
        Some(open) => (decl[..open].trim(), parse_dims(&decl[open..], line_num)?),
        None => (decl, Vec::new()),
    };
    if !is_ident(name) {
        return Err(err(format!("Expected parameter name in '{s}'")));
    }

    let mut param = Param::new(name, ty).with_dims(dims);
    param.derived = derived;
    Ok(param)
}

/// Parse `void`, a single output, or a parenthesised list of outputs.
fn parse_outputs(s: &str, line_num: usize) -> Result<Vec<Output>, ParseError> {
    if s == "void" {
        return Ok(Vec::new());
    }
    if s.starts_with('(') {
        let close = find_matching(s, 0, '(', ')').ok_or_else(|| ParseError {
            line: line_num,
            message: "Unmatched '(' in output list".to_string(),
        })?;
        if !s[close + 1..].trim().is_empty() {
            return Err(ParseError {
                line: line_num,
                message: format!("Unexpected text after output list: '{}'", s[close + 1..].trim()),
            });
        }
        return split_top_level(&s[1..close])
            .into_iter()
            .map(|o| parse_output(o, line_num))
            .collect();
    }
    Ok(vec![parse_output(s, line_num)?])
}

/// Parse `kind`, `vec<kind>[size]` or `mat<kind>[size, size]`.
fn parse_output(s: &str, line_num: usize) -> Result<Output, ParseError> {
    let (ty, rest) = split_type(s).ok_or_else(|| ParseError {
        line: line_num,
        message: format!("Unknown output type: '{s}'"),
    })?;
    let dims = if rest.is_empty() {
        Vec::new()
    } else {
        parse_dims(rest, line_num)?
    };
    Ok(Output::new(ty, dims))
}

/// Parse `[size]` or `[size, size]`.
fn parse_dims(s: &str, line_num: usize) -> Result<Vec<SizeExpr>, ParseError> {
    let s = s.trim();
    let inner = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError {
            line: line_num,
            message: format!("Expected '[size]' but found '{s}'"),
        })?;
    split_top_level(inner)
        .into_iter()
        .map(|d| {
            SizeExpr::parse(d).ok_or_else(|| ParseError {
                line: line_num,
                message: format!("Invalid size expression '{d}'"),
            })
        })
        .collect()
}

/// Split a leading type off `s`, returning the type and the trimmed remainder.
fn split_type(s: &str) -> Option<(ParamType, &str)> {
    let s = s.trim();
    let end = if s.starts_with("vec<") || s.starts_with("mat<") {
        s.find('>')? + 1
    } else {
        s.find(|c: char| c.is_whitespace() || c == '[').unwrap_or(s.len())
    };
    let ty = ParamType::parse(&s[..end])?;
    Some((ty, s[end..].trim()))
}

/// Split on commas that are not nested in brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, ch) in s.char_indices() {
        match ch {
            '(' | '<' | '[' => depth += 1,
            ')' | '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Find the position of the bracket closing the one at `open_pos`.
fn find_matching(s: &str, open_pos: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0;
    for (i, ch) in s[open_pos..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_pos + i);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use numbridge_marshal::NumericKind;

    #[test]
    fn test_parse_simple_signature() {
        let sig = parse_signature_line("add: (real a, real b) -> real", 1).unwrap();
        assert_eq!(sig.name, "add");
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[0].ty, ParamType::scalar(NumericKind::Real));
        assert_eq!(sig.outputs, vec![Output::new(ParamType::scalar(NumericKind::Real), vec![])]);
    }

    #[test]
    fn test_parse_nullary_and_void() {
        let sig = parse_signature_line("get_pi: () -> real", 1).unwrap();
        assert!(sig.params.is_empty());

        let sig = parse_signature_line("reset: (vec<real> buf) -> void", 1).unwrap();
        assert!(sig.outputs.is_empty());
    }

    #[test]
    fn test_parse_derived_size() {
        let sig =
            parse_signature_line("dot: (vec<real> x[n], vec<real> y[n], int n = len(x)) -> real", 1)
                .unwrap();
        assert_eq!(sig.params[0].dims, vec![SizeExpr::Param("n".into())]);
        assert_eq!(sig.params[2].derived, Some(SizeExpr::Len("x".into())));
        assert_eq!(sig.short_arity(), Some(2));
    }

    #[test]
    fn test_parse_output_list() {
        let sig = parse_signature_line(
            "split: (mat<complex> a) -> (vec<complex>[rows(a)], mat<real>[cols(a), 2], int)",
            1,
        )
        .unwrap();
        assert_eq!(sig.outputs.len(), 3);
        assert_eq!(
            sig.outputs[1].dims,
            vec![SizeExpr::Cols("a".into()), SizeExpr::Const(2)]
        );
    }

    #[test]
    fn test_display_round_trips() {
        let line = "transpose: (mat<real> a) -> mat<real>[cols(a), rows(a)]";
        let sig = parse_signature_line(line, 1).unwrap();
        assert_eq!(sig.to_string(), line);
        assert_eq!(parse_signature_line(&sig.to_string(), 1).unwrap(), sig);
    }

    #[test]
    fn test_parse_file_content() {
        let content = r#"
# Reductions
sum: (vec<real> x) -> real
dot: (vec<real> x[n], vec<real> y[n], int n = len(x)) -> real

# Shapes
transpose: (mat<real> a) -> mat<real>[cols(a), rows(a)]
"#;
        let file = SignatureFile::parse(content).unwrap();
        assert_eq!(file.len(), 3);
        assert!(file.contains("sum"));
        assert!(file.contains("dot"));
        assert!(file.contains("transpose"));
    }

    #[test]
    fn test_documented_forms_parse() {
        let content = r#"
dot: (vec<real> x[n], vec<real> y[n], int n = len(x)) -> real
transpose: (mat<real> a) -> mat<real>[cols(a), rows(a)]
minmax: (vec<int> v) -> (int, int)
reset: (vec<real> buf) -> void
scale: (mat<complex> a[m, k], int m = rows(a), int k = cols(a), complex s) -> mat<complex>[m, k]
"#;
        let file = SignatureFile::parse(content).unwrap();
        assert_eq!(file.len(), 5);

        let transpose = file.get("transpose").unwrap();
        assert!(transpose.params[0].dims.is_empty());
        assert_eq!(transpose.short_arity(), None);

        let minmax = file.get("minmax").unwrap();
        assert_eq!(minmax.outputs.len(), 2);

        let reset = file.get("reset").unwrap();
        assert!(reset.outputs.is_empty());
        assert_eq!(reset.full_arity(), 1);

        let scale = file.get("scale").unwrap();
        assert_eq!(scale.full_arity(), 4);
        assert_eq!(scale.short_arity(), Some(2));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = SignatureFile::parse("ok: () -> void\nbad: (float x) -> void").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("float x"));

        let err = parse_signature_line("f: (vec<real> x) -> vec<real>", 7).unwrap_err();
        assert_eq!(err.line, 7);

        let err = parse_signature_line("f: (vec<real> x) -> vec<real>[len(y)]", 1).unwrap_err();
        assert!(err.message.contains("unknown parameter 'y'"));

        assert!(parse_signature_line("f (real x) -> real", 1).is_err());
        assert!(parse_signature_line("f: (real x -> real", 1).is_err());
        assert!(parse_signature_line("f: (real x) real", 1).is_err());
    }
}
