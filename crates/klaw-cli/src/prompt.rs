use std::io::{self, BufRead, Write};

use klaw_core::annotation::Annotation;

/// Ask on stderr, read the answer from stdin. Anything but y/yes declines.
pub(crate) fn confirm_annotation(annotation: &Annotation) -> bool {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();
    match ask(&mut input, &mut output, annotation) {
        Ok(answer) => answer,
        Err(err) => {
            tracing::warn!(error = %err, "could not read confirmation; skipping");
            false
        }
    }
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, annotation: &Annotation) -> io::Result<bool> {
    write!(
        output,
        "\ncreate issue ({})\n\ttitle: {}\n\tbody: {}\n? [y/N] ",
        annotation.location(),
        annotation.text,
        annotation.text
    )?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn annotation() -> Annotation {
        Annotation {
            text: "add retries".to_string(),
            identifier: None,
            status: None,
            source_file: PathBuf::from("main.go"),
            line_number: Some(3),
        }
    }

    fn answer(reply: &str) -> bool {
        let mut input = Cursor::new(reply.as_bytes().to_vec());
        let mut output = Vec::new();
        ask(&mut input, &mut output, &annotation()).expect("ask")
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(answer("y\n"));
        assert!(answer("YES\n"));
        assert!(!answer("\n"));
        assert!(!answer("n\n"));
        assert!(!answer(""));
    }

    #[test]
    fn prompt_shows_title_and_location() {
        let mut input = Cursor::new(b"n\n".to_vec());
        let mut output = Vec::new();
        ask(&mut input, &mut output, &annotation()).expect("ask");
        let shown = String::from_utf8(output).expect("utf8");
        assert!(shown.contains("create issue (main.go:3)"));
        assert!(shown.contains("\ttitle: add retries"));
        assert!(shown.ends_with("? [y/N] "));
    }
}
