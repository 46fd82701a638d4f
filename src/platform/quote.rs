// src/platform/quote.rs

//! Shell quoting for the PATH-lookup fallback.
//!
//! When a chain command's program cannot be found on PATH, the
//! supervisor re-runs the whole argv through the platform's default
//! shell (`sh -c …` / `pwsh.exe -command …`). The functions here turn
//! an argv back into a single line that the shell parses into the
//! original tokens.
//!
//! Both quoters are compiled on every platform so the contract can be
//! tested anywhere; [`quote_argv`] picks the one for the current OS.

/// Characters that are backslash-escaped in POSIX unquoted words.
const SPECIAL: &str = "\\'\"`${[|&;<>()*?!";

/// Characters that force the whole word into single-quote mode.
const EXTRA_SPECIAL: &str = " \t\n";

/// Characters escaped only at the start of a word (`~user` expansion).
const PREFIX: &str = "~";

/// Quote an argv for the default shell of the current platform.
pub fn quote_argv<S: AsRef<str>>(args: &[S]) -> String {
    if cfg!(windows) {
        powershell(args)
    } else {
        posix(args)
    }
}

/// Join an argv into a line parseable by `sh -c`.
///
/// Words without whitespace get backslash escapes; words containing
/// space/tab/newline are single-quoted with embedded quotes rendered
/// as `'\''`.
pub fn posix<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        posix_word(arg.as_ref(), &mut out);
    }
    out
}

fn posix_word(word: &str, out: &mut String) {
    if word.is_empty() {
        out.push_str("''");
        return;
    }
    if word.chars().any(|c| EXTRA_SPECIAL.contains(c)) {
        posix_single_quoted(word, out);
        return;
    }
    let mut at_start = true;
    for c in word.chars() {
        if SPECIAL.contains(c) || (at_start && PREFIX.contains(c)) {
            out.push('\\');
        }
        out.push(c);
        at_start = false;
    }
}

// Single-quote mode: wrap runs of non-quote characters in '...', and
// splice every literal quote in between as \'.
fn posix_single_quoted(word: &str, out: &mut String) {
    let mut in_quote = false;
    let mut rest = word;
    while let Some(i) = rest.find('\'') {
        if i > 0 {
            if !in_quote {
                out.push('\'');
                in_quote = true;
            }
            out.push_str(&rest[..i]);
        }
        rest = &rest[i + 1..];
        if in_quote {
            out.push('\'');
            in_quote = false;
        }
        out.push_str("\\'");
    }
    if !rest.is_empty() {
        if !in_quote {
            out.push('\'');
        }
        out.push_str(rest);
        out.push('\'');
    }
}

/// Join an argv into a line parseable by `pwsh.exe -command`.
///
/// The program name is emitted verbatim; arguments containing
/// PowerShell metacharacters are single-quoted with embedded quotes
/// doubled.
pub fn powershell<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let arg = arg.as_ref();
        if i == 0 {
            out.push_str(arg);
            continue;
        }
        out.push(' ');
        if arg.is_empty() {
            out.push_str("''");
        } else if !arg.chars().any(|c| " '`$(){}<>|&;*".contains(c)) {
            out.push_str(arg);
        } else {
            out.push('\'');
            out.push_str(&arg.replace('\'', "''"));
            out.push('\'');
        }
    }
    out
}
