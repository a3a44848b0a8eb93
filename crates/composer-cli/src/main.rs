use anyhow::{Context, Result, bail};
use composer_config::Settings;
use composer_engine::{
    Cmd, ComposerSession, convert_content, process_content_for_draft, process_content_for_html,
    process_content_for_plain_text,
};
use std::{env, fs, path::Path, process};

const USAGE: &str = "Usage: composer-cli <to-plain|to-html|draft|reply|wrap> <input-file> [from-domain]
       composer-cli init-config [config-file]";

/// What to produce from the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Rich HTML message to plain text
    ToPlain,
    /// Rich HTML message to outgoing HTML
    ToHtml,
    /// Rich HTML message to a draft document
    Draft,
    /// Received plain text to a quoted reply
    Reply,
    /// Plain text re-wrapped at the configured width
    Wrap,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "to-plain" => Some(Self::ToPlain),
            "to-html" => Some(Self::ToHtml),
            "draft" => Some(Self::Draft),
            "reply" => Some(Self::Reply),
            "wrap" => Some(Self::Wrap),
            _ => None,
        }
    }
}

fn run(command: Command, input: &str, settings: Settings, domain: Option<&str>) -> Result<String> {
    let output = match command {
        Command::ToPlain => {
            let session = ComposerSession::from_html(input, settings);
            process_content_for_plain_text(&session)
        }
        Command::ToHtml => {
            let mut session = ComposerSession::from_html(input, settings);
            let content = process_content_for_html(&mut session, domain);
            for image in &content.inline_images {
                log::info!("inline image {} as cid:{}", image.src, image.id);
            }
            content.html
        }
        Command::Draft => {
            let session = ComposerSession::from_html(input, settings);
            process_content_for_draft(&session)
        }
        Command::Reply => {
            let mut session = ComposerSession::new(settings);
            convert_content(&mut session, input);
            if session.settings().html_mode {
                process_content_for_html(&mut session, None).html
            } else {
                process_content_for_plain_text(&session)
            }
        }
        Command::Wrap => {
            let mut session = ComposerSession::new(Settings {
                html_mode: false,
                ..settings
            });
            let text = input.strip_suffix('\n').unwrap_or(input);
            if !text.is_empty() && !session.apply(Cmd::Paste { text: text.to_string() }).handled {
                bail!("failed to load text into the composer");
            }
            process_content_for_plain_text(&session)
        }
    };
    Ok(output)
}

/// Write the default settings to `path`. An existing file is left alone.
fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("'{}' already exists", path.display());
    }
    Settings::default()
        .save_to_path(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("init-config") && args.len() <= 3 {
        let path = args
            .get(2)
            .map_or_else(Settings::config_path, |p| Path::new(p).to_path_buf());
        init_config(&path)?;
        println!("Wrote default settings to {}", path.display());
        return Ok(());
    }
    if !(3..=4).contains(&args.len()) {
        eprintln!("{USAGE}");
        process::exit(1);
    }
    let Some(command) = Command::parse(&args[1]) else {
        eprintln!("Error: unknown command '{}'", args[1]);
        eprintln!("{USAGE}");
        process::exit(1);
    };

    let config_path = Settings::config_path();
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", config_path.display());
            process::exit(1);
        }
    };
    log::debug!("settings from {}: {settings:?}", config_path.display());

    let input = read_input(Path::new(&args[2]))?;
    let output = run(command, &input, settings, args.get(3).map(String::as_str))?;
    println!("{output}");
    Ok(())
}
