use std::ffi::OsString;
use std::io::{self, BufRead, ErrorKind, Read, Write};

use esql_error::{Diagnostic, EsqlError};
use esql_parser::{parse, ParseOptions, Token};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PROMPT_PRIMARY: &str = "esql> ";
const PROMPT_CONTINUATION: &str = " ...> ";
const STDIN_PATH: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// The re-rendered query.
    Text,
    /// One token per line, hidden tokens included.
    Tokens,
    /// The whole parse result as pretty JSON.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    query_path: Option<String>,
    command: Option<String>,
    config_path: Option<String>,
    dev: bool,
    format: OutputFormat,
    show_help: bool,
}

fn main() {
    init_tracing();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let parse_options = match load_options(options.config_path.as_deref(), options.dev) {
        Ok(parse_options) => parse_options,
        Err(error) => return report_error(&error, err),
    };

    if let Some(command) = options.command.as_deref() {
        return run_query(command, &parse_options, options.format, out, err);
    }

    match options.query_path.as_deref() {
        Some(STDIN_PATH) => {
            let mut text = String::new();
            if let Err(error) = input.read_to_string(&mut text) {
                return report_error(&EsqlError::Io(error), err);
            }
            run_query(&text, &parse_options, options.format, out, err)
        }
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => run_query(&text, &parse_options, options.format, out, err),
            Err(error) => {
                let _ = writeln!(err, "error: failed reading query file `{path}`: {error}");
                EsqlError::Io(error).exit_code()
            }
        },
        None => run_repl(parse_options, options.format, input, out, err),
    }
}

#[allow(clippy::too_many_lines)]
fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut query_path: Option<String> = None;
    let mut command: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut dev = false;
    let mut format: Option<OutputFormat> = None;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        match arg_str {
            "-h" | "--help" => {
                show_help = true;
            }
            "--dev" => {
                dev = true;
            }
            "--tokens" => set_format(&mut format, OutputFormat::Tokens)?,
            "--json" => set_format(&mut format, OutputFormat::Json)?,
            "-c" | "--command" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing query argument for `-c/--command`"))?;
                set_command(
                    &mut command,
                    query_path.as_deref(),
                    next.to_string_lossy().into_owned(),
                )?;
            }
            "--config" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing file argument for `--config`"))?;
                set_config(&mut config_path, next.to_string_lossy().into_owned())?;
            }
            _ => {
                if let Some(value) = arg_str
                    .strip_prefix("-c=")
                    .or_else(|| arg_str.strip_prefix("--command="))
                {
                    set_command(&mut command, query_path.as_deref(), value.to_owned())?;
                    continue;
                }

                if let Some(value) = arg_str.strip_prefix("--config=") {
                    set_config(&mut config_path, value.to_owned())?;
                    continue;
                }

                if arg_str.starts_with('-') && arg_str != STDIN_PATH {
                    return Err(format!("unknown option `{arg_str}`"));
                }

                if command.is_some() {
                    return Err(String::from(
                        "query file cannot be combined with `-c/--command`",
                    ));
                }
                if query_path.is_some() {
                    return Err(String::from(
                        "too many positional arguments; expected at most one query file",
                    ));
                }
                query_path = Some(arg_str.to_owned());
            }
        }
    }

    Ok(CliOptions {
        query_path,
        command,
        config_path,
        dev,
        format: format.unwrap_or(OutputFormat::Text),
        show_help,
    })
}

fn set_format(slot: &mut Option<OutputFormat>, format: OutputFormat) -> Result<(), String> {
    match *slot {
        Some(existing) if existing != format => Err(String::from(
            "`--tokens` cannot be combined with `--json`",
        )),
        _ => {
            *slot = Some(format);
            Ok(())
        }
    }
}

fn set_command(
    slot: &mut Option<String>,
    query_path: Option<&str>,
    value: String,
) -> Result<(), String> {
    if query_path.is_some() {
        return Err(String::from(
            "`-c/--command` cannot be combined with a query file",
        ));
    }
    if slot.is_some() {
        return Err(String::from("`-c/--command` may only be provided once"));
    }
    *slot = Some(value);
    Ok(())
}

fn set_config(slot: &mut Option<String>, value: String) -> Result<(), String> {
    if slot.is_some() {
        return Err(String::from("`--config` may only be provided once"));
    }
    *slot = Some(value);
    Ok(())
}

/// Options from the config file (if any), with `--dev` forcing dev features on.
fn load_options(config_path: Option<&str>, dev: bool) -> esql_error::Result<ParseOptions> {
    let mut options = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            debug!(path, "loaded parser configuration");
            ParseOptions::from_json(&text)?
        }
        None => ParseOptions::default(),
    };
    if dev {
        options.dev_features = true;
    }
    Ok(options)
}

fn report_error<E>(error: &EsqlError, err: &mut E) -> i32
where
    E: Write,
{
    let _ = writeln!(err, "error: {error}");
    if let Some(hint) = error.suggestion() {
        let _ = writeln!(err, "hint: {hint}");
    }
    error.exit_code()
}

/// Parse one query and print it in `format`. Returns the process exit code.
fn run_query<W, E>(
    text: &str,
    options: &ParseOptions,
    format: OutputFormat,
    out: &mut W,
    err: &mut E,
) -> i32
where
    W: Write,
    E: Write,
{
    if text.len() > options.max_input_bytes {
        let error = EsqlError::InputTooLong {
            length: text.len(),
            max: options.max_input_bytes,
        };
        return report_error(&error, err);
    }

    let output = parse(text, options);
    let written = match format {
        OutputFormat::Text => {
            if output.query.commands.is_empty() {
                Ok(())
            } else {
                writeln!(out, "{}", output.query)
            }
        }
        OutputFormat::Tokens => output
            .tokens
            .iter()
            .try_for_each(|token| writeln!(out, "{}", format_token(token))),
        OutputFormat::Json => match serde_json::to_string_pretty(&output) {
            Ok(json) => writeln!(out, "{json}"),
            Err(error) => return report_error(&EsqlError::Json(error), err),
        },
    };
    if written.is_err() {
        let _ = writeln!(err, "error: failed writing parse output");
        return 1;
    }

    if format != OutputFormat::Json {
        for diagnostic in &output.diagnostics {
            let _ = writeln!(err, "{}", render_diagnostic(text, diagnostic));
        }
    }
    i32::from(!output.is_ok())
}

fn format_token(token: &Token<'_>) -> String {
    let mut line = format!(
        "{}:{}\t{:?}\t{:?}",
        token.line, token.col, token.kind, token.text
    );
    if token.is_hidden() {
        line.push_str("\thidden");
    }
    line
}

/// A diagnostic with the offending source line and a caret underline.
fn render_diagnostic(source: &str, diagnostic: &Diagnostic) -> String {
    let label = if diagnostic.is_error() {
        "error"
    } else {
        "warning"
    };
    let line_index = diagnostic.line.saturating_sub(1) as usize;
    let source_line = source
        .split('\n')
        .nth(line_index)
        .unwrap_or("")
        .trim_end_matches('\r');
    let offending = diagnostic.span.slice(source);
    let width = offending
        .split('\n')
        .next()
        .map_or(0, |first| first.chars().count())
        .max(1);
    let pad = " ".repeat(diagnostic.col.saturating_sub(1) as usize);
    format!(
        "{label}: {diagnostic}\n  | {source_line}\n  | {pad}{}",
        "^".repeat(width)
    )
}

fn run_repl<R, W, E>(
    mut options: ParseOptions,
    mut format: OutputFormat,
    input: &mut R,
    out: &mut W,
    err: &mut E,
) -> i32
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut pending = String::new();
    let mut line_buffer = String::new();

    loop {
        let prompt = if pending.trim().is_empty() {
            PROMPT_PRIMARY
        } else {
            PROMPT_CONTINUATION
        };

        if write!(out, "{prompt}").and_then(|()| out.flush()).is_err() {
            return 1;
        }

        line_buffer.clear();
        let bytes_read = match input.read_line(&mut line_buffer) {
            Ok(bytes_read) => bytes_read,
            Err(error) if error.kind() == ErrorKind::Interrupted => {
                // Ctrl-C drops the pending query, not the shell.
                pending.clear();
                let _ = writeln!(out);
                continue;
            }
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                return 1;
            }
        };

        if bytes_read == 0 {
            if !pending.trim().is_empty() {
                let _ = run_query(pending.trim(), &options, format, out, err);
            }
            return 0;
        }

        let line = line_buffer.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim();

        if pending.trim().is_empty() {
            if matches!(trimmed, ".exit" | ".quit") {
                return 0;
            }
            if trimmed.starts_with('.') {
                if !run_dot_command(trimmed, &mut options, &mut format, out, err) {
                    return 1;
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
        } else if trimmed.is_empty() {
            // A blank line submits whatever is pending.
            let _ = run_query(pending.trim(), &options, format, out, err);
            pending.clear();
            continue;
        }

        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(line);

        if query_complete(&pending) {
            let _ = run_query(pending.trim(), &options, format, out, err);
            pending.clear();
        }
    }
}

/// Handle a `.command` line. Returns false only when output fails.
fn run_dot_command<W, E>(
    line: &str,
    options: &mut ParseOptions,
    format: &mut OutputFormat,
    out: &mut W,
    err: &mut E,
) -> bool
where
    W: Write,
    E: Write,
{
    let mut parts = line.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match (name, arg) {
        (".help", _) => write_repl_help(out).is_ok(),
        (".dev", "on") => {
            options.dev_features = true;
            true
        }
        (".dev", "off") => {
            options.dev_features = false;
            true
        }
        (".mode", "text") => {
            *format = OutputFormat::Text;
            true
        }
        (".mode", "tokens") => {
            *format = OutputFormat::Tokens;
            true
        }
        (".mode", "json") => {
            *format = OutputFormat::Json;
            true
        }
        (".read", "") => {
            let _ = writeln!(err, "error: usage: .read FILE");
            true
        }
        (".read", path) => {
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let _ = run_query(&text, options, *format, out, err);
                }
                Err(error) => {
                    let _ = writeln!(err, "error: failed reading query file `{path}`: {error}");
                }
            }
            true
        }
        _ => {
            let _ = writeln!(err, "error: unknown dot command `{line}`; try .help");
            true
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryScanState {
    Normal,
    Quoted,
    TripleQuoted,
    Backtick,
    LineComment,
    BlockComment,
}

impl QueryScanState {
    const fn is_unterminated(self) -> bool {
        matches!(
            self,
            Self::Quoted | Self::TripleQuoted | Self::Backtick | Self::BlockComment
        )
    }
}

/// Whether `buffer` reads as a finished query: no open quote, comment or
/// bracket, and not ending on a pipe or a comma.
fn query_complete(buffer: &str) -> bool {
    let bytes = buffer.as_bytes();
    let mut state = QueryScanState::Normal;
    let mut last_significant: Option<u8> = None;
    let mut depth = 0i32;

    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            QueryScanState::Normal => {
                if b.is_ascii_whitespace() {
                    i += 1;
                    continue;
                }
                if bytes[i..].starts_with(b"//") {
                    state = QueryScanState::LineComment;
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"/*") {
                    state = QueryScanState::BlockComment;
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"\"\"\"") {
                    state = QueryScanState::TripleQuoted;
                    last_significant = Some(b);
                    i += 3;
                    continue;
                }
                match b {
                    b'"' => state = QueryScanState::Quoted,
                    b'`' => state = QueryScanState::Backtick,
                    b'(' | b'[' => depth += 1,
                    b')' | b']' => depth -= 1,
                    _ => {}
                }
                last_significant = Some(b);
                i += 1;
            }
            QueryScanState::Quoted => {
                match b {
                    b'\\' => i += 1,
                    b'"' => state = QueryScanState::Normal,
                    _ => {}
                }
                i += 1;
            }
            QueryScanState::TripleQuoted => {
                if bytes[i..].starts_with(b"\"\"\"") {
                    state = QueryScanState::Normal;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            QueryScanState::Backtick => {
                if b == b'`' {
                    if bytes.get(i + 1) == Some(&b'`') {
                        i += 1;
                    } else {
                        state = QueryScanState::Normal;
                    }
                }
                i += 1;
            }
            QueryScanState::LineComment => {
                if b == b'\n' {
                    state = QueryScanState::Normal;
                }
                i += 1;
            }
            QueryScanState::BlockComment => {
                if bytes[i..].starts_with(b"*/") {
                    state = QueryScanState::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    if state.is_unterminated() || depth > 0 {
        return false;
    }
    !matches!(last_significant, None | Some(b'|' | b','))
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: esql [QUERY_FILE|-] [-c|--command QUERY] [--dev] [--tokens|--json] [--config FILE]\n\
         \n\
         Without a query, starts an interactive shell reading from stdin.\n\
         `-` reads a single query from stdin.\n\
         \n\
         Options:\n\
         \n\
         --dev          Enable preview commands (INLINESTATS, LOOKUP, MATCH, METRICS)\n\
         --tokens       Print the token stream instead of the query\n\
         --json         Print the full parse result as JSON\n\
         --config FILE  Load parser options from a JSON file\n\
         \n\
         Examples:\n\
         \n\
         esql -c \"FROM logs | WHERE status == 200 | LIMIT 10\"\n\
         esql --tokens -c \"ROW a = 1\"\n\
         esql --dev --json query.esql\n\
         echo \"SHOW INFO\" | esql -\n",
    )
}

fn write_repl_help<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Dot commands:\n\
         \n\
         .help                   Show this help\n\
         .quit                   Exit the shell\n\
         .exit                   Exit the shell\n\
         .dev on|off             Toggle preview commands\n\
         .mode text|tokens|json  Choose the output format\n\
         .read FILE              Parse a query from file\n\
         \n\
         A query is parsed once it no longer ends with `|` or `,` and all\n\
         quotes and brackets are closed. A blank line submits it as is.\n",
    )
}
