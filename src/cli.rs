//! Hand-rolled argument parsing for the `qalgo` binary. The spec's single-dash
//! long-flag convention (`-file`, `-recursive`, `-output`) does not map onto
//! clap's GNU-style derive macros, so this mirrors the original C++
//! `main.cpp`'s manual `argv` walk instead (see SPEC_FULL.md section D).

use std::path::PathBuf;

use crate::error::{QalgoError, Result};

#[derive(Clone, Debug, Default)]
pub struct CliArgs {
    pub file: Option<PathBuf>,
    pub recursive: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub silent: bool,
    pub log: bool,
    pub printbins: bool,
    pub help: bool,
}

impl CliArgs {
    /// Parses flags, applying "last flag wins" for repeated `-o`/`-output`
    /// (a deliberate precedence choice, see SPEC_FULL.md section D).
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut out = CliArgs::default();
        let mut it = args.into_iter().peekable();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-f" | "-file" => {
                    let v = it.next().ok_or(QalgoError::NoInputMode)?;
                    out.file = Some(PathBuf::from(v));
                }
                "-r" | "-recursive" => {
                    let v = it.next().ok_or(QalgoError::NoInputMode)?;
                    out.recursive = Some(PathBuf::from(v));
                }
                "-o" | "-output" => {
                    let v = it.next().ok_or(QalgoError::NoInputMode)?;
                    out.output = Some(PathBuf::from(v));
                }
                "-s" | "-silent" => out.silent = true,
                "-log" => out.log = true,
                "-pb" | "-printbins" => out.printbins = true,
                "-h" | "-help" => out.help = true,
                other => {
                    tracing::warn!(flag = other, "ignoring unrecognised flag");
                }
            }
        }

        if out.help {
            return Ok(out);
        }
        match (&out.file, &out.recursive) {
            (Some(_), Some(_)) => return Err(QalgoError::ConflictingInputMode),
            (None, None) => return Err(QalgoError::NoInputMode),
            _ => {}
        }
        if let Some(f) = &out.file {
            if !f.exists() {
                return Err(QalgoError::MissingInput(f.clone()));
            }
            if f.extension().and_then(|e| e.to_str()) != Some("mzML") {
                return Err(QalgoError::BadExtension(f.clone()));
            }
        }
        Ok(out)
    }

    pub const HELP_TEXT: &'static str = "\
qalgo - non-target LC-MS peak detection

USAGE:
    qalgo -f FILE.mzML [-o DIR] [-s] [-log] [-pb]
    qalgo -r DIR [-o DIR] [-s] [-log] [-pb]

FLAGS:
    -f, -file PATH        single input mzML file
    -r, -recursive DIR    recursively process every mzML file under DIR
    -o, -output DIR       output directory ('#' = alongside input); last wins
    -s, -silent           log only warnings and above
    -log                  write a DEBUG-level detail log file
    -pb, -printbins       also emit _summary.csv and _bins.csv
    -h, -help             print this help and exit
";
}
