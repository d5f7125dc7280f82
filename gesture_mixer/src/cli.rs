//! Command-line arguments.

use std::path::PathBuf;

use thiserror::Error;

pub const USAGE: &str = "Usage: gesture_mixer [--config PATH] [--camera INDEX] [--no-loop] [--verbose] SONG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("missing song file\n{}", USAGE)]
    MissingSong,

    #[error("{0} needs a value\n{usage}", usage = USAGE)]
    MissingValue(String),

    #[error("invalid camera index {0:?}")]
    BadCameraIndex(String),

    #[error("unknown option {0}\n{usage}", usage = USAGE)]
    UnknownOption(String),

    #[error("more than one song given: {0:?}")]
    ExtraArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub song:    PathBuf,
    pub config:  Option<PathBuf>,
    pub camera:  Option<u32>,
    pub no_loop: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CliArgs),
    Help,
}

/// Parse everything after the program name.
pub fn parse_args<I, S>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut song    = None;
    let mut config  = None;
    let mut camera  = None;
    let mut no_loop = false;
    let mut verbose = false;

    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--no-loop"     => no_loop = true,
            "-v" | "--verbose" => verbose = true,
            "--config" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                config = Some(PathBuf::from(value));
            }
            "--camera" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                camera = Some(value.parse::<u32>().map_err(|_| CliError::BadCameraIndex(value))?);
            }
            s if s.starts_with('-') && s.len() > 1 => return Err(CliError::UnknownOption(arg)),
            _ => {
                if song.is_some() {
                    return Err(CliError::ExtraArgument(arg));
                }
                song = Some(PathBuf::from(arg));
            }
        }
    }

    let song = song.ok_or(CliError::MissingSong)?;
    Ok(Command::Run(CliArgs { song, config, camera, no_loop, verbose }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> CliArgs {
        match parse_args(args.iter().copied()).unwrap() {
            Command::Run(a) => a,
            Command::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn song_alone() {
        let a = run(&["song.mp3"]);
        assert_eq!(a.song, PathBuf::from("song.mp3"));
        assert_eq!(a.config, None);
        assert_eq!(a.camera, None);
        assert!(!a.no_loop);
        assert!(!a.verbose);
    }

    #[test]
    fn all_options_in_any_order() {
        let a = run(&["--verbose", "track.flac", "--camera", "1", "--no-loop", "--config", "c.yaml"]);
        assert_eq!(a.song, PathBuf::from("track.flac"));
        assert_eq!(a.config, Some(PathBuf::from("c.yaml")));
        assert_eq!(a.camera, Some(1));
        assert!(a.no_loop);
        assert!(a.verbose);
    }

    #[test]
    fn help_wins() {
        assert_eq!(parse_args(["song.wav", "--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn errors() {
        assert_eq!(parse_args(Vec::<String>::new()), Err(CliError::MissingSong));
        assert_eq!(parse_args(["a.wav", "--config"]), Err(CliError::MissingValue("--config".into())));
        assert_eq!(parse_args(["--camera", "front", "a.wav"]), Err(CliError::BadCameraIndex("front".into())));
        assert_eq!(parse_args(["--fast", "a.wav"]), Err(CliError::UnknownOption("--fast".into())));
        assert_eq!(parse_args(["a.wav", "b.wav"]), Err(CliError::ExtraArgument("b.wav".into())));
    }

    #[test]
    fn lone_dash_is_a_song_name() {
        assert_eq!(run(&["-"]).song, PathBuf::from("-"));
    }
}
