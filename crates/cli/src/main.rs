// fxbar - token formula editor from the terminal
//
// Commands: eval (one-shot evaluation), suggest (query the tag endpoint),
// edit (interactive editor).

mod args;
mod exit_codes;
mod tui;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use fxbar_config::Settings;
use fxbar_engine::formula::{build_expression, calculate};
use fxbar_engine::token::format_number;
use fxbar_engine::Token;
use fxbar_suggest::{SuggestError, SuggestionFeed, SuggestionSource};

use args::Catalog;
use exit_codes::{
    EXIT_SUCCESS, EXIT_ERROR,
    EXIT_EVAL_ABSENT, EXIT_EDIT_TERMINAL,
    suggest_exit_code,
};

#[derive(Parser)]
#[command(name = "fxbar")]
#[command(about = "Token formula editor: build, evaluate and edit arithmetic over tagged values")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Suggestion endpoint URL (beats FXBAR_AUTOCOMPLETE_URL and settings.json)
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a token sequence
    #[command(after_help = "\
Examples:
  fxbar eval 3 + 4 '*' 2
  fxbar eval '(' 1 + 2 ')' ^ 2
  fxbar eval @Revenue / 12 --json
  fxbar eval --keys '3+4*2'
  fxbar eval --keys 'rev\\n*2'      (Enter picks the first suggestion)

Tokens: + - * / ( ) ^ are operators, numbers are numbers, @name is a tag
from the suggestion endpoint, anything else is free text.
Exit code 3 means the sequence has no value.")]
    Eval {
        /// Tokens, one per argument
        #[arg(allow_negative_numbers = true, conflicts_with = "keys")]
        tokens: Vec<String>,

        /// Type TEXT through the editor keyboard contract instead
        #[arg(long, value_name = "TEXT")]
        keys: Option<String>,

        /// Print {expression, result, tokens} as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch suggestions matching QUERY (all when omitted)
    Suggest {
        query: Option<String>,

        /// Print the suggestion list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive formula editor
    #[command(after_help = "\
Keys: type numbers, operators and names. Space commits text, Enter picks the
first suggestion, Backspace deletes left, Left/Right move the cursor.
Ctrl+E edits the token left of the cursor, Delete removes the token right of it.
F1 shows all keys, Ctrl+C quits.")]
    Edit {
        /// Initial tokens (same syntax as eval)
        #[arg(allow_negative_numbers = true)]
        tokens: Vec<String>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  fxbar-engine ", env!("CARGO_PKG_VERSION"),
        "\nsuggest: fxbar-suggest ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    // stderr only: stdout carries results and --json output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            eprintln!("Usage: fxbar <command> [options]");
            eprintln!("       fxbar --help for more information");
            Ok(())
        }
        Some(Commands::Eval { tokens, keys, json }) => cmd_eval(cli.url, tokens, keys, json),
        Some(Commands::Suggest { query, json }) => cmd_suggest(cli.url, query, json),
        Some(Commands::Edit { tokens }) => cmd_edit(cli.url, tokens),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// General failure (write errors, rejected keystrokes).
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Silent failure: the formula has no value.
    pub fn absent() -> Self {
        Self { code: EXIT_EVAL_ABSENT, message: String::new(), hint: None }
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EDIT_TERMINAL, message: msg.into(), hint: None }
    }

    /// Create error from a suggestion fetch failure with the matching exit code.
    pub fn suggest(err: SuggestError) -> Self {
        let code = suggest_exit_code(&err);
        let hint = match &err {
            SuggestError::NotConfigured => Some(format!(
                "pass --url, export {} or set \"suggest.url\" in {}",
                fxbar_config::URL_ENV_VAR,
                Settings::config_path_display()
            )),
            SuggestError::Network(_) => Some("is the suggestion endpoint reachable?".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// eval
// ============================================================================

#[derive(Serialize)]
struct EvalOutput<'a> {
    expression: String,
    result: Option<f64>,
    tokens: &'a [Token],
}

fn cmd_eval(url: Option<String>, tokens: Vec<String>, keys: Option<String>, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let mut catalog = Catalog::new(&settings, url.as_deref());

    let items = match keys {
        Some(text) => args::replay_keys(&text, &mut catalog)?.into_store().items().to_vec(),
        None => args::resolve_tokens(&tokens, &mut catalog)?,
    };

    let expression = build_expression(&items);
    let result = calculate(&items);
    log::debug!("eval {:?} -> {:?}", expression, result);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let output = EvalOutput { expression, result, tokens: &items };
        let text = serde_json::to_string(&output).map_err(|e| CliError::general(e.to_string()))?;
        writeln!(out, "{}", text).map_err(|e| CliError::general(e.to_string()))?;
    } else if let Some(value) = result {
        writeln!(out, "{}", format_number(value)).map_err(|e| CliError::general(e.to_string()))?;
    }

    match result {
        Some(_) => Ok(()),
        None => Err(CliError::absent()),
    }
}

// ============================================================================
// suggest
// ============================================================================

fn cmd_suggest(url: Option<String>, query: Option<String>, json: bool) -> Result<(), CliError> {
    let settings = Settings::load();
    let client = Catalog::new(&settings, url.as_deref())
        .client()
        .map_err(CliError::suggest)?;
    let query = query.unwrap_or_default();
    let suggestions = client.fetch(&query).map_err(CliError::suggest)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let text = serde_json::to_string(&suggestions).map_err(|e| CliError::general(e.to_string()))?;
        writeln!(out, "{}", text).map_err(|e| CliError::general(e.to_string()))?;
        return Ok(());
    }

    if suggestions.is_empty() {
        eprintln!("no suggestions match {:?}", query);
        return Ok(());
    }

    let name_width = suggestions.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    let category_width = suggestions.iter().map(|s| s.category.chars().count()).max().unwrap_or(0);
    for s in &suggestions {
        writeln!(
            out,
            "{:name_width$}  {:category_width$}  {}",
            s.name,
            s.category,
            s.value,
            name_width = name_width,
            category_width = category_width,
        )
        .map_err(|e| CliError::general(e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// edit
// ============================================================================

fn cmd_edit(url: Option<String>, tokens: Vec<String>) -> Result<(), CliError> {
    let settings = Settings::load();
    let mut catalog = Catalog::new(&settings, url.as_deref());
    let initial = args::resolve_tokens(&tokens, &mut catalog)?;

    let feed = if catalog.is_configured() {
        let client = catalog.client().map_err(CliError::suggest)?;
        let source: Arc<dyn SuggestionSource> = Arc::new(client);
        Some(SuggestionFeed::new(source, settings.stale_time()))
    } else {
        log::info!("no suggestion endpoint configured; editing without suggestions");
        None
    };

    let store = tui::run(initial, feed, settings.show_instructions)
        .map_err(|e| CliError::terminal(e).with_hint("fxbar edit needs an interactive terminal"))?;

    // Leave the final formula on the normal screen
    let expression = build_expression(store.items());
    match store.result() {
        Some(value) => println!("{} = {}", expression, format_number(value)),
        None if !store.is_empty() => println!("{}", expression),
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CliError::general("write failed").code, EXIT_ERROR);
        let absent = CliError::absent();
        assert_eq!(absent.code, EXIT_EVAL_ABSENT);
        assert!(absent.message.is_empty());
        assert_eq!(CliError::suggest(SuggestError::NotConfigured).code, 10);
        assert!(CliError::suggest(SuggestError::NotConfigured).hint.is_some());
    }
}
