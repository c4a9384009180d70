//! `rpp` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `rpp_core` parse/edit/serialize calls.
//! - Own all file I/O: one scoped read, one atomic write per command.
//!
//! # Invariants
//! - A failed command never leaves a partially written project behind.
//! - Exit code is non-zero for every error.

use clap::{Parser, Subcommand};
use log::{error, info};
use rpp_core::{
    add_midi_item, add_track, default_log_level, default_project, ensure_synth, ensure_track,
    find_track, init_logging, parse, remove_track, serialize, set_render_file, set_tempo,
    Document, EditError, Guid, LogLevel, LoggingError, ParseError, Project, ProjectSettings,
    TrackQuery, ValidationError,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::NamedTempFile;

#[derive(Debug, Parser)]
#[command(name = "rpp")]
#[command(version = rpp_core::core_version())]
#[command(about = "Inspect and edit REAPER project files without losing content")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity (trace|debug|info|warn|error)
    #[arg(long, global = true, value_parser = LogLevel::parse)]
    log_level: Option<LogLevel>,

    /// Directory for rotating log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print tempo, time signature, tracks and items
    Inspect {
        project: PathBuf,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a project from the default template
    New {
        project: PathBuf,

        #[arg(long, default_value_t = 120.0)]
        tempo: f64,

        /// Time signature as `numerator/denominator`
        #[arg(long, default_value = "4/4", value_parser = parse_time_signature)]
        time_signature: (u32, u32),

        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,

        #[arg(long, default_value = "render")]
        render_file: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Append an empty track
    AddTrack { project: PathBuf, name: String },

    /// Add a looping MIDI item referencing a file; creates the track if needed
    AddMidi {
        project: PathBuf,

        /// Path of the MIDI file as stored in the project
        file: String,

        /// Track name
        #[arg(long)]
        track: String,

        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Length in seconds
        #[arg(long)]
        length: f64,

        /// Do not add a synth to the track's FX chain
        #[arg(long)]
        no_synth: bool,
    },

    /// Change the project tempo
    SetTempo { project: PathBuf, bpm: f64 },

    /// Remove a track by name, `{identifier}` or `#index`
    RemoveTrack { project: PathBuf, track: String },

    /// Change the render output name
    SetRenderFile { project: PathBuf, name: String },

    /// Verify that the project survives a parse/serialize round trip
    Check { project: PathBuf },
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: ParseError },
    Edit(EditError),
    Validation(ValidationError),
    Logging(LoggingError),
    Json(serde_json::Error),
    AlreadyExists(PathBuf),
    TrackNotFound(String),
    RoundTrip { path: PathBuf, line: usize },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Edit(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "failed to encode summary: {err}"),
            Self::AlreadyExists(path) => {
                write!(f, "{} already exists; pass --force to overwrite", path.display())
            }
            Self::TrackNotFound(selector) => write!(f, "no track matches `{selector}`"),
            Self::RoundTrip { path, line } => write!(
                f,
                "{}: serialized text differs from the file at line {line}",
                path.display()
            ),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Edit(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::AlreadyExists(_) | Self::TrackNotFound(_) | Self::RoundTrip { .. } => None,
        }
    }
}

impl From<EditError> for CliError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    match run(cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    if let Some(dir) = &cli.log_dir {
        let dir = absolute(dir)?;
        init_logging(cli.log_level.unwrap_or_else(default_log_level), &dir)?;
    }

    match cli.command {
        Command::Inspect { project, json } => {
            let doc = load(&project)?;
            let summary = Project::new(&doc).summary()?;
            let written = if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)
            } else {
                writeln!(out, "{summary}")
            };
            written.map_err(stdout_error)?;
        }
        Command::New {
            project,
            tempo,
            time_signature,
            sample_rate,
            render_file,
            force,
        } => {
            if project.exists() && !force {
                return Err(CliError::AlreadyExists(project));
            }
            let settings = ProjectSettings {
                tempo_bpm: tempo,
                time_signature,
                sample_rate,
                render_file,
            };
            let doc = default_project(&settings)?;
            store(&project, &doc)?;
            writeln!(out, "created {}", project.display()).map_err(stdout_error)?;
        }
        Command::AddTrack { project, name } => {
            edit(&project, out, |doc| {
                let id = add_track(doc, &name)?.id();
                Ok(format!("added track {id}"))
            })?;
        }
        Command::AddMidi {
            project,
            file,
            track,
            start,
            length,
            no_synth,
        } => {
            edit(&project, out, |doc| {
                let track_id = ensure_track(doc, &track)?.id();
                let item_id = add_midi_item(doc, track_id, &file, start, length)?
                    .id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                if !no_synth {
                    ensure_synth(doc, track_id)?;
                }
                Ok(format!("added item {item_id} to track {track_id}"))
            })?;
        }
        Command::SetTempo { project, bpm } => {
            edit(&project, out, |doc| {
                set_tempo(doc, bpm)?;
                Ok(format!("tempo set to {bpm} BPM"))
            })?;
        }
        Command::RemoveTrack { project, track } => {
            let mut doc = load(&project)?;
            let track_id = resolve_track(&doc, &track)?;
            remove_track(&mut doc, track_id)?;
            store(&project, &doc)?;
            writeln!(out, "removed track {track_id}").map_err(stdout_error)?;
        }
        Command::SetRenderFile { project, name } => {
            edit(&project, out, |doc| {
                set_render_file(doc, &name)?;
                Ok(format!("render file set to {name}"))
            })?;
        }
        Command::Check { project } => {
            let text = read(&project)?;
            let doc = parse(&text).map_err(|source| CliError::Parse {
                path: project.clone(),
                source,
            })?;
            let written = serialize(&doc);
            if let Some(line) = first_difference(&text, &written) {
                return Err(CliError::RoundTrip {
                    path: project,
                    line,
                });
            }
            writeln!(out, "{}: round trip ok", project.display()).map_err(stdout_error)?;
        }
    }
    Ok(())
}

/// Loads, applies `apply`, writes back and reports its message.
fn edit(
    path: &Path,
    out: &mut impl Write,
    apply: impl FnOnce(&mut Document) -> Result<String, EditError>,
) -> Result<(), CliError> {
    let mut doc = load(path)?;
    let message = apply(&mut doc)?;
    store(path, &doc)?;
    info!("event=cli_edit module=cli status=ok");
    writeln!(out, "{message}").map_err(stdout_error)
}

fn resolve_track(doc: &Document, selector: &str) -> Result<Guid, CliError> {
    let index = selector
        .strip_prefix('#')
        .and_then(|index| index.parse::<usize>().ok());
    if let Some(index) = index {
        return find_track(doc, &TrackQuery::Index(index))
            .map(|track| track.id())
            .ok_or_else(|| CliError::TrackNotFound(selector.to_string()));
    }
    if let Some(id) = Guid::parse_braced(selector) {
        return Ok(id);
    }
    find_track(doc, &TrackQuery::Name(selector.to_string()))
        .map(|track| track.id())
        .ok_or_else(|| CliError::TrackNotFound(selector.to_string()))
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load(path: &Path) -> Result<Document, CliError> {
    let text = read(path)?;
    parse(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes through a temp file in the target directory, then renames.
fn store(path: &Path, doc: &Document) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(serialize(doc).as_bytes()).map_err(io_error)?;
    file.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn stdout_error(source: std::io::Error) -> CliError {
    CliError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}

fn parse_time_signature(text: &str) -> Result<(u32, u32), String> {
    let (numerator, denominator) = text
        .split_once('/')
        .ok_or_else(|| format!("expected `numerator/denominator`, got `{text}`"))?;
    let parse_part = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid time signature part `{part}`: {err}"))
    };
    Ok((parse_part(numerator)?, parse_part(denominator)?))
}

/// 1-based line of the first difference, or `None` when equal.
fn first_difference(expected: &str, actual: &str) -> Option<usize> {
    if expected == actual {
        return None;
    }
    let mismatch = expected
        .split('\n')
        .zip(actual.split('\n'))
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| expected.split('\n').count().min(actual.split('\n').count()));
    Some(mismatch + 1)
}

#[cfg(test)]
mod tests {
    use super::{first_difference, parse_time_signature, run, Cli, CliError};
    use clap::Parser;
    use std::path::Path;

    fn run_args(args: &[&str]) -> Result<String, CliError> {
        let cli = Cli::try_parse_from(std::iter::once("rpp").chain(args.iter().copied()))
            .expect("arguments should parse");
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).expect("output should be UTF-8"))
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().expect("temp path should be UTF-8")
    }

    #[test]
    fn new_add_and_inspect_round_trip_through_files() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let project = dir.path().join("song.rpp");
        let project = path_str(&project);

        run_args(&["new", project]).expect("new should succeed");
        run_args(&["add-midi", project, "midi/drums.mid", "--track", "Drums", "--length", "8"])
            .expect("add-midi should succeed");
        run_args(&["set-tempo", project, "85"]).expect("set-tempo should succeed");

        let summary = run_args(&["inspect", project]).expect("inspect should succeed");
        assert!(summary.starts_with("Tempo: 85 BPM\nTime Signature: 4/4\nTracks: 1\n"));
        assert!(summary.contains("  - Drums\n      MIDI: drums.mid at 0s"));

        let json = run_args(&["inspect", project, "--json"]).expect("inspect --json should succeed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("output should be JSON");
        assert_eq!(value["tracks"][0]["name"], "Drums");
        assert_eq!(value["tempo"]["bpm"], 85.0);

        let check = run_args(&["check", project]).expect("check should succeed");
        assert!(check.ends_with("round trip ok\n"));
    }

    #[test]
    fn add_midi_gives_the_track_a_synth_unless_disabled() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("song.rpp");
        let project = path_str(&path);

        run_args(&["new", project]).expect("new should succeed");
        run_args(&["add-midi", project, "a.mid", "--track", "Lead", "--length", "4"])
            .expect("add-midi should succeed");
        run_args(&["add-midi", project, "b.mid", "--track", "Lead", "--length", "4"])
            .expect("second add-midi should succeed");
        run_args(&["add-midi", project, "c.mid", "--track", "Dry", "--length", "4", "--no-synth"])
            .expect("add-midi without synth should succeed");

        let text = std::fs::read_to_string(&path).expect("project should be readable");
        assert_eq!(text.matches("<FXCHAIN").count(), 1);
        assert_eq!(text.matches("VSTi: ReaSynth (Cockos)").count(), 1);
    }

    #[test]
    fn new_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let project = dir.path().join("song.rpp");
        let project = path_str(&project);

        run_args(&["new", project]).expect("first new should succeed");
        assert!(matches!(run_args(&["new", project]), Err(CliError::AlreadyExists(_))));
        run_args(&["new", project, "--force", "--tempo", "90"]).expect("forced new should succeed");
    }

    #[test]
    fn failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("song.rpp");
        let project = path_str(&path);

        run_args(&["new", project]).expect("new should succeed");
        let before = std::fs::read_to_string(&path).expect("project should be readable");
        assert!(matches!(
            run_args(&["set-tempo", project, "961"]),
            Err(CliError::Edit(_))
        ));
        let after = std::fs::read_to_string(&path).expect("project should be readable");
        assert_eq!(before, after);
    }

    #[test]
    fn remove_track_by_name_and_index() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let project = dir.path().join("song.rpp");
        let project = path_str(&project);

        run_args(&["new", project]).expect("new should succeed");
        run_args(&["add-track", project, "Bass"]).expect("add-track should succeed");
        run_args(&["add-track", project, "Keys"]).expect("add-track should succeed");
        run_args(&["remove-track", project, "#0"]).expect("remove by index should succeed");
        run_args(&["remove-track", project, "Keys"]).expect("remove by name should succeed");
        assert!(matches!(
            run_args(&["remove-track", project, "Keys"]),
            Err(CliError::TrackNotFound(_))
        ));

        let summary = run_args(&["inspect", project]).expect("inspect should succeed");
        assert!(summary.contains("Tracks: 0"));
    }

    #[test]
    fn time_signature_argument_parsing() {
        assert_eq!(parse_time_signature("7/8"), Ok((7, 8)));
        assert!(parse_time_signature("7").is_err());
        assert!(parse_time_signature("x/4").is_err());
    }

    #[test]
    fn first_difference_reports_one_based_line() {
        assert_eq!(first_difference("a\nb\n", "a\nb\n"), None);
        assert_eq!(first_difference("a\nb\n", "a\nc\n"), Some(2));
        assert_eq!(first_difference("a\n", "a"), Some(2));
    }
}
