//! Parsing of `grctool tool <name> ...` arguments.
//!
//! Tool parameters are open-ended, so everything after the tool name is taken
//! raw from clap and parsed here. `--task-ref`, `--output`, `--quiet`,
//! `--config`, `--data-dir` and `-v`/`--verbose` are reserved; every other `--flag` becomes
//! a parameter with dashes mapped to underscores.

use grc_tool::{Invocation, ParamValue, Params};
use std::path::PathBuf;

/// The only supported output format.
pub const OUTPUT_JSON: &str = "json";

/// Malformed tool arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgsError {
    /// Nothing after `tool`
    #[error("missing tool name")]
    MissingToolName,
    /// Positional argument where a `--flag` was expected
    #[error("unexpected argument '{arg}': parameters are given as --name value")]
    UnexpectedArgument {
        /// Offending token
        arg: String,
    },
    /// `--` or `--=value`
    #[error("empty parameter name in '{arg}'")]
    EmptyName {
        /// Offending token
        arg: String,
    },
    /// Reserved option given without a value
    #[error("--{flag} requires a value")]
    MissingValue {
        /// Option name
        flag: String,
    },
    /// `--output` other than json
    #[error("unsupported output format '{format}' (only 'json' is supported)")]
    UnsupportedOutput {
        /// Requested format
        format: String,
    },
    /// `--quiet=<value>` that is not a boolean
    #[error("invalid value for --quiet: '{value}'")]
    InvalidQuiet {
        /// Given value
        value: String,
    },
}

/// Parsed `tool <name>` invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolArgs {
    /// Tool name
    pub name: String,
    /// Tool parameters
    pub params: Params,
    /// Raw `--task-ref`
    pub task_ref: Option<String>,
    /// Compact output
    pub quiet: bool,
    /// `--config` given after the tool name
    pub config: Option<PathBuf>,
    /// `--data-dir` given after the tool name
    pub data_dir: Option<PathBuf>,
    /// `-v` occurrences after the tool name
    pub verbose: u8,
}

impl ToolArgs {
    /// Dispatcher request for these arguments
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        let invocation = Invocation::new(&self.name).with_params(self.params.clone());
        match &self.task_ref {
            Some(task_ref) => invocation.with_task_ref(task_ref),
            None => invocation,
        }
    }
}

/// Parse the raw tokens of an external `tool` subcommand; the first token is
/// the tool name.
///
/// `--name value` and `--name=value` produce string parameters, a bare
/// `--name` produces `true`. Repeating a parameter collects its values into a
/// list.
///
/// # Errors
///
/// Returns error on positional tokens, empty names, reserved options missing
/// their value, or an output format other than json
pub fn parse_tool_args<S: AsRef<str>>(tokens: &[S]) -> Result<ToolArgs, ArgsError> {
    let mut iter = tokens.iter().map(AsRef::as_ref).peekable();
    let name = iter
        .next()
        .filter(|name| !name.trim().is_empty())
        .ok_or(ArgsError::MissingToolName)?;
    let mut args = ToolArgs {
        name: name.to_string(),
        ..ToolArgs::default()
    };

    while let Some(token) = iter.next() {
        if let Some(count) = verbose_count(token) {
            args.verbose = args.verbose.saturating_add(count);
            continue;
        }
        let Some(body) = token.strip_prefix("--") else {
            return Err(ArgsError::UnexpectedArgument {
                arg: token.to_string(),
            });
        };

        let (raw_name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        if raw_name.is_empty() {
            return Err(ArgsError::EmptyName {
                arg: token.to_string(),
            });
        }
        let key = raw_name.replace('-', "_");
        if key == "verbose" {
            if inline.is_some() {
                return Err(ArgsError::UnexpectedArgument {
                    arg: token.to_string(),
                });
            }
            args.verbose = args.verbose.saturating_add(1);
            continue;
        }

        // A following token is a value unless it is itself an option.
        let value = match inline {
            Some(value) => Some(value),
            None => iter
                .next_if(|next| !next.starts_with("--") && verbose_count(next).is_none())
                .map(str::to_string),
        };

        match key.as_str() {
            "task_ref" => args.task_ref = Some(required(value, raw_name)?),
            "config" => args.config = Some(PathBuf::from(required(value, raw_name)?)),
            "data_dir" => args.data_dir = Some(PathBuf::from(required(value, raw_name)?)),
            "output" => {
                let format = required(value, raw_name)?;
                if !format.eq_ignore_ascii_case(OUTPUT_JSON) {
                    return Err(ArgsError::UnsupportedOutput { format });
                }
            }
            "quiet" => {
                args.quiet = match value {
                    None => true,
                    Some(value) => grc_tool::validate::parse_bool(&value)
                        .ok_or(ArgsError::InvalidQuiet { value })?,
                };
            }
            _ => {
                let value = value.map_or(ParamValue::Bool(true), ParamValue::String);
                insert_param(&mut args.params, key, value);
            }
        }
    }

    Ok(args)
}

fn required(value: Option<String>, flag: &str) -> Result<String, ArgsError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ArgsError::MissingValue {
            flag: flag.to_string(),
        })
}

fn insert_param(params: &mut Params, key: String, value: ParamValue) {
    match params.get_mut(&key) {
        None => {
            params.insert(key, value);
        }
        Some(ParamValue::List(items)) => items.push(value.to_string()),
        Some(existing) => {
            let first = existing.to_string();
            *existing = ParamValue::List(vec![first, value.to_string()]);
        }
    }
}

/// `-v`, `-vv`, ... as a count
fn verbose_count(token: &str) -> Option<u8> {
    let flags = token.strip_prefix('-')?;
    if flags.is_empty() || flags.starts_with('-') || !flags.chars().all(|c| c == 'v') {
        return None;
    }
    Some(u8::try_from(flags.len()).unwrap_or(u8::MAX))
}
