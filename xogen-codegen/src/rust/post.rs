//! Post-processing of generated files.

use crate::error::PostError;

/// Checks that `src` parses as a Rust file and normalizes its whitespace.
///
/// Trailing whitespace is stripped, runs of blank lines collapse to one and
/// the file ends with a single newline.
///
/// # Errors
/// Returns `PostError` with the location of the first syntax error.
pub fn post_process(src: &str) -> Result<String, PostError> {
    if let Err(err) = syn::parse_file(src) {
        let start = err.span().start();
        let post = PostError::new(err.to_string());
        return Err(if start.line == 0 {
            post
        } else {
            post.at(start.line, start.column + 1)
        });
    }

    let mut out = String::with_capacity(src.len());
    let mut blank = false;
    for line in src.lines().map(str::trim_end) {
        if line.is_empty() {
            if !blank && !out.is_empty() {
                out.push('\n');
            }
            blank = true;
            continue;
        }
        blank = false;
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_whitespace() {
        let src = "\n\nfn a() {}   \n\n\n\nfn b() {}\n\n";
        let out = post_process(src).expect("Failed to post-process");
        assert_eq!(out, "fn a() {}\n\nfn b() {}\n");
    }

    #[test]
    fn test_reports_syntax_error_location() {
        let err = post_process("fn a() {}\nfn b( {}\n").expect_err("should fail");
        assert!(err.line.is_some());
        assert!(!err.message.is_empty());
    }
}
