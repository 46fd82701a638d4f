// src/cli.rs

//! Argument parsing: one argv in, a list of supervisor specs out.
//!
//! The grammar is deliberately shell-friendly rather than
//! convention-friendly: single-dash long flags in Go style, `::`
//! separators both between parallel instances (`:: wgo`) and between
//! chained commands, and an escape rule for literal colon runs. Flag
//! parsing stops at the first positional token so command arguments
//! are never mistaken for flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;

use crate::errors::CliError;
use crate::spec::{SupervisorSpec, DEFAULT_DEBOUNCE};
use crate::watch::patterns::compile_pattern;

/// Top-level help, printed when `wgo` is invoked with no arguments.
pub const HELP: &str = "Usage:
  wgo [FLAGS] <command> [ARGUMENTS...]
  wgo gcc -o main main.c
  wgo go build -o main main.go
  wgo -file .c gcc -o main main.c
  wgo -file=.go go build -o main main.go

  wgo run [FLAGS] [GO_BUILD_FLAGS] <package> [ARGUMENTS...]
  wgo run main.go
  wgo run -file .html main.go arg1 arg2 arg3
  wgo run -file .html . arg1 arg2 arg3
  wgo run -file=.css -file=.js -tags=fts5 ./cmd/my_project arg1 arg2 arg3

Pass in the -h flag to wgo or wgo run to learn what flags there are.
";

/// Usage for a plain `wgo` instance, printed on `-h`.
pub const USAGE: &str = "Usage:
  wgo [FLAGS] <command> [ARGUMENTS...]
  wgo gcc -o main main.c
  wgo go build -o main main.go
  wgo -file .c gcc -o main main.c
  wgo -file=.go go build -o main main.go
Flags:
  -cd DIR
        Change to a different directory to run the commands.
  -debounce DUR
        How quickly to react to file events. Lower debounce values will
        react quicker. Default 300ms.
  -dir RX
        Include directory regex. Can be repeated.
  -exit
        Exit when the last command exits.
  -file RX
        Include file regex. Can be repeated.
  -poll DUR
        How often to poll for file changes. Zero or no value means no
        polling.
  -postpone
        Postpone the first execution of the command until a file is
        modified.
  -root DIR
        Specify an additional root directory to watch. Can be repeated.
  -stdin
        Enable stdin for the last command.
  -verbose
        Log file events.
  -xdir RX
        Exclude directory regex. Can be repeated.
  -xfile RX
        Exclude file regex. Can be repeated.
";

/// Usage for a `wgo run` instance, printed on `-h`.
pub const RUN_USAGE: &str = "Usage:
  wgo run [FLAGS] [GO_BUILD_FLAGS] <package> [ARGUMENTS...]
  wgo run main.go
  wgo run -file .html main.go arg1 arg2 arg3
  wgo run -file .html . arg1 arg2 arg3
  wgo run -file=.css -file=.js -tags=fts5 ./cmd/my_project arg1 arg2 arg3
Flags:
  All the flags of plain wgo, plus the go build flags, which are
  forwarded to the generated `go build` command: -p, -asmflags,
  -buildmode, -compiler, -gccgoflags, -gcflags, -installsuffix,
  -ldflags, -mod, -modfile, -overlay, -pkgdir, -tags, -toolexec, -exec
  (string valued) and -a, -n, -race, -msan, -asan, -v, -work, -x,
  -buildvcs, -linkshared, -modcacherw, -trimpath (boolean valued).
";

/// String-valued `go build` flags forwarded verbatim in run mode.
const STR_BUILD_FLAGS: &[&str] = &[
    "p",
    "asmflags",
    "buildmode",
    "compiler",
    "gccgoflags",
    "gcflags",
    "installsuffix",
    "ldflags",
    "mod",
    "modfile",
    "overlay",
    "pkgdir",
    "tags",
    "toolexec",
    "exec",
];

/// Boolean `go build` flags forwarded verbatim in run mode.
const BOOL_BUILD_FLAGS: &[&str] = &[
    "a",
    "n",
    "race",
    "msan",
    "asan",
    "v",
    "work",
    "x",
    "buildvcs",
    "linkshared",
    "modcacherw",
    "trimpath",
];

/// Parse the full argv (program name included) into supervisor specs.
///
/// Each `:: wgo` token pair starts a new parallel instance; the `wgo`
/// token is consumed as the new instance's program name. Errors are
/// labelled with the instance they came from.
pub fn parse_commands(args: &[String]) -> Result<Vec<SupervisorSpec>, CliError> {
    let mut specs = Vec::new();
    let mut start = 1;
    let mut j = 1;
    let mut number = 1;
    while j < args.len() {
        if args[j] == "::" && j + 1 < args.len() && args[j + 1] == "wgo" {
            let label = instance_label(number);
            let spec =
                parse_command(&label, &args[start..j]).map_err(|e| e.for_instance(&label))?;
            specs.push(spec);
            start = j + 2;
            j = start;
            number += 1;
        } else {
            j += 1;
        }
    }
    if j > start {
        let label = instance_label(number);
        let spec = parse_command(&label, &args[start..j]).map_err(|e| e.for_instance(&label))?;
        specs.push(spec);
    }
    Ok(specs)
}

fn instance_label(number: usize) -> String {
    if number == 1 {
        "wgo".to_string()
    } else {
        format!("wgo{number}")
    }
}

/// Parse one instance's tokens (program name already stripped).
fn parse_command(label: &str, args: &[String]) -> Result<SupervisorSpec, CliError> {
    let cwd = std::env::current_dir()?;
    let mut spec = SupervisorSpec::new(cwd.clone(), label.to_string());

    let mut rest = args;
    if matches!(rest.first(), Some(t) if t == "run") {
        spec.is_run_mode = true;
        rest = &rest[1..];
    }

    let mut debounce: Option<String> = None;
    let mut poll: Option<String> = None;
    let mut build_str_flags: Vec<String> = Vec::new();
    let mut build_bool_flags = vec![false; BOOL_BUILD_FLAGS.len()];

    let mut i = 0;
    let pos_start;
    loop {
        if i >= rest.len() {
            pos_start = i;
            break;
        }
        let token = rest[i].as_str();
        if token == "--" {
            pos_start = i + 1;
            break;
        }
        if token == "-" || !token.starts_with('-') {
            pos_start = i;
            break;
        }
        let body = token.strip_prefix("--").unwrap_or(&token[1..]);
        if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
            return Err(CliError::BadFlagSyntax(token.to_string()));
        }
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (body.to_string(), None),
        };
        match name.as_str() {
            "h" | "help" => {
                return Err(CliError::Help(if spec.is_run_mode { RUN_USAGE } else { USAGE }));
            }
            "cd" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.cwd_override = Some(absolutize(&cwd, &value));
            }
            "root" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.roots.push(absolutize(&cwd, &value));
            }
            "file" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.file_includes.push(flag_pattern(&name, &value)?);
            }
            "xfile" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.file_excludes.push(flag_pattern(&name, &value)?);
            }
            "dir" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.dir_includes.push(flag_pattern(&name, &value)?);
            }
            "xdir" => {
                let value = flag_value(rest, &mut i, &name, inline)?;
                spec.dir_excludes.push(flag_pattern(&name, &value)?);
            }
            "debounce" => debounce = Some(flag_value(rest, &mut i, &name, inline)?),
            "poll" => poll = Some(flag_value(rest, &mut i, &name, inline)?),
            "exit" => spec.exit_when_done = flag_bool(&mut i, &name, inline.as_deref())?,
            "stdin" => spec.enable_stdin = flag_bool(&mut i, &name, inline.as_deref())?,
            "verbose" => spec.verbose = flag_bool(&mut i, &name, inline.as_deref())?,
            "postpone" => spec.postpone = flag_bool(&mut i, &name, inline.as_deref())?,
            _ => {
                if spec.is_run_mode && STR_BUILD_FLAGS.contains(&name.as_str()) {
                    let value = flag_value(rest, &mut i, &name, inline)?;
                    build_str_flags.push(format!("-{name}"));
                    build_str_flags.push(value);
                } else if let Some(idx) = spec
                    .is_run_mode
                    .then(|| BOOL_BUILD_FLAGS.iter().position(|f| *f == name))
                    .flatten()
                {
                    build_bool_flags[idx] = flag_bool(&mut i, &name, inline.as_deref())?;
                } else {
                    return Err(CliError::UnknownFlag(name));
                }
            }
        }
    }
    let positionals = &rest[pos_start..];

    spec.debounce = parse_flag_duration("debounce", debounce)?.unwrap_or(DEFAULT_DEBOUNCE);
    spec.poll = parse_flag_duration("poll", poll)?.filter(|d| !d.is_zero());

    if spec.is_run_mode {
        synthesize_run_chain(&mut spec, positionals, build_str_flags, &build_bool_flags)?;
    } else {
        spec.command_chain = split_chain(positionals)?;
    }
    Ok(spec)
}

/// Consume a string flag's value, either from `-name=value` or from
/// the next token.
fn flag_value(
    rest: &[String],
    i: &mut usize,
    name: &str,
    inline: Option<String>,
) -> Result<String, CliError> {
    match inline {
        Some(value) => {
            *i += 1;
            Ok(value)
        }
        None => {
            if *i + 1 >= rest.len() {
                return Err(CliError::MissingValue(name.to_string()));
            }
            let value = rest[*i + 1].clone();
            *i += 2;
            Ok(value)
        }
    }
}

/// Consume a boolean flag: bare means true, `-name=value` parses the
/// value. Booleans never consume the next token, so `-exit mycmd`
/// leaves `mycmd` as the command.
fn flag_bool(i: &mut usize, name: &str, inline: Option<&str>) -> Result<bool, CliError> {
    *i += 1;
    match inline {
        None => Ok(true),
        Some(value) => match value {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(CliError::BadValue {
                flag: name.to_string(),
                message: format!("invalid boolean value {value:?}"),
            }),
        },
    }
}

fn flag_pattern(flag: &str, value: &str) -> Result<regex::Regex, CliError> {
    compile_pattern(value).map_err(|err| CliError::BadValue {
        flag: flag.to_string(),
        message: err.to_string(),
    })
}

/// An empty value is "unset": the default for `-debounce`, disabled
/// for `-poll`.
fn parse_flag_duration(flag: &str, value: Option<String>) -> Result<Option<Duration>, CliError> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => humantime::parse_duration(text)
            .map(Some)
            .map_err(|err| CliError::BadValue {
                flag: flag.to_string(),
                message: err.to_string(),
            }),
    }
}

fn absolutize(cwd: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Split positional tokens into the command chain. `::` starts a new
/// argv; a token of three or more colons loses one colon and is kept
/// literal.
fn split_chain(positionals: &[String]) -> Result<Vec<Vec<String>>, CliError> {
    let mut chain: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for arg in positionals {
        if arg == "::" {
            if current.is_empty() {
                return Err(empty_argv_error(&chain));
            }
            chain.push(std::mem::take(&mut current));
            continue;
        }
        current.push(decode_colon_escape(arg));
    }
    if current.is_empty() {
        return Err(empty_argv_error(&chain));
    }
    chain.push(current);
    Ok(chain)
}

fn empty_argv_error(chain: &[Vec<String>]) -> CliError {
    if chain.is_empty() {
        CliError::EmptyCommand
    } else {
        CliError::EmptyChainCommand
    }
}

/// Unescape `:::` to `::`, `::::` to `:::`, and so on.
fn decode_colon_escape(arg: &str) -> String {
    if arg.len() > 2 && arg.bytes().all(|b| b == b':') {
        arg[1..].to_string()
    } else {
        arg.to_string()
    }
}

/// Build the two-command run-mode chain: `go build -o <tmp> [flags]
/// <package>` followed by `<tmp> [program args]`.
fn synthesize_run_chain(
    spec: &mut SupervisorSpec,
    positionals: &[String],
    build_str_flags: Vec<String>,
    build_bool_flags: &[bool],
) -> Result<(), CliError> {
    let mut positionals = positionals.iter();
    let package = positionals.next().ok_or(CliError::MissingPackage)?;

    let executable = temp_binary_path();
    let executable_arg = executable.to_string_lossy().into_owned();

    let mut build: Vec<String> = vec![
        "go".to_string(),
        "build".to_string(),
        "-o".to_string(),
        executable_arg.clone(),
    ];
    build.extend(build_str_flags);
    for (idx, on) in build_bool_flags.iter().enumerate() {
        if *on {
            build.push(format!("-{}", BOOL_BUILD_FLAGS[idx]));
        }
    }
    build.push(package.clone());

    let mut program = vec![executable_arg];
    for arg in positionals {
        if arg == "::" {
            return Err(CliError::RunChainSeparator);
        }
        program.push(decode_colon_escape(arg));
    }

    spec.executable_path = Some(executable);
    spec.command_chain = vec![build, program];
    Ok(())
}

/// Pick a fresh path for the run-mode binary: `$GOTMPDIR` (or the OS
/// temp directory) + `wgo_<timestamp>_<nonce>`, `.exe`-suffixed on
/// Windows.
fn temp_binary_path() -> PathBuf {
    let tmp_dir = std::env::var_os("GOTMPDIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let nonce: u32 = rand::thread_rng().gen_range(0..5000);
    let mut name = format!("wgo_{stamp}_{nonce}");
    if cfg!(windows) {
        name.push_str(".exe");
    }
    tmp_dir.join(name)
}
