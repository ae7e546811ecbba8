//! Input selection: named files, or stdin when none are given.

use crate::config::StreamConfig;
use crate::error::Result;
use crate::source::Pread;
use crate::stream::SeekablePipe;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Any record source, seekable or not.
pub type DynSource = Box<dyn Pread>;

/// One input of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    Path(PathBuf),
}

impl Input {
    /// `-` names stdin.
    pub fn from_arg(arg: impl AsRef<Path>) -> Self {
        let path = arg.as_ref();
        if path.as_os_str() == "-" {
            Input::Stdin
        } else {
            Input::Path(path.to_path_buf())
        }
    }

    /// Open the input for positional reads.
    ///
    /// On unix stdin is duplicated into a [`File`], so stdin redirected from
    /// a regular file stays seekable and a pipe falls back to buffering.
    pub fn open(&self) -> Result<DynSource> {
        match self {
            Input::Stdin => open_stdin(),
            Input::Path(path) => {
                let file = File::open(path)
                    .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;
                Ok(Box::new(file))
            }
        }
    }

    pub fn open_stream(&self, config: StreamConfig) -> Result<SeekablePipe<DynSource>> {
        debug!(input = %self, "opening input");
        Ok(SeekablePipe::with_config(self.open()?, config))
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("<stdin>"),
            Input::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(unix)]
fn open_stdin() -> Result<DynSource> {
    use std::os::fd::AsFd;
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(Box::new(File::from(fd)))
}

#[cfg(not(unix))]
fn open_stdin() -> Result<DynSource> {
    Ok(Box::new(crate::source::Sequential::new(io::stdin())))
}

/// Inputs named by `args`, or stdin alone when there are none.
pub fn inputs_or_stdin<I>(args: I) -> Vec<Input>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let inputs: Vec<Input> = args.into_iter().map(Input::from_arg).collect();
    if inputs.is_empty() {
        vec![Input::Stdin]
    } else {
        inputs
    }
}

/// Open each input in turn and hand its stream to `f`.
///
/// Stops at the first error, including a file that cannot be opened.
pub fn stdin_or_each<I, F>(args: I, config: StreamConfig, mut f: F) -> Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
    F: FnMut(&Input, &mut SeekablePipe<DynSource>) -> Result<()>,
{
    for input in inputs_or_stdin(args) {
        let mut stream = input.open_stream(config)?;
        f(&input, &mut stream)?;
    }
    Ok(())
}
