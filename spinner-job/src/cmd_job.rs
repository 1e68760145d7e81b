//  CMD JOB.rs
//
//  Created:
//    09 Feb 2023, 10:02:17
//  Last edited:
//    21 Feb 2023, 11:33:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the jobs that run an arbitrary, user-given command in
//!   every VM.
//

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use log::debug;
use prettytable::format::FormatBuilder;
use prettytable::{Cell, Row, Table};

use crate::errors::JobError;
use crate::spec::{Job, JobKind, VmOutput};


/***** TESTS *****/





/***** LIBRARY *****/
/// Runs a user-given command in every VM, and keeps track of how much each of them said.
#[derive(Debug)]
pub struct CommandJob {
    /// Where the command came from.
    kind    : JobKind,
    /// The images to run on.
    images  : Vec<String>,
    /// The command to run.
    command : String,

    /// The number of output lines per image.
    lines : HashMap<String, usize>,
}

impl CommandJob {
    /// Constructor for the CommandJob.
    ///
    /// # Arguments
    /// - `kind`: The kind of job this is, used in error messages and the summary.
    /// - `command`: The command to run in every VM.
    /// - `images`: The images to run on. Must not be empty.
    ///
    /// # Returns
    /// A new CommandJob instance.
    ///
    /// # Errors
    /// This function errors if there are no images or the command is empty.
    pub fn new(kind: JobKind, command: impl Into<String>, images: Vec<String>) -> Result<Self, JobError> {
        if images.is_empty() { return Err(JobError::MissingImages{ kind }); }
        let command: String = command.into();
        if command.trim().is_empty() { return Err(JobError::EmptyCommand{ kind }); }

        debug!("Created '{}' job running {} byte(s) of command on {} image(s)", kind, command.len(), images.len());
        Ok(Self {
            kind,
            images,
            command,

            lines : HashMap::new(),
        })
    }

    /// Constructor for the CommandJob that reads the command from the given reader (e.g., stdin).
    ///
    /// # Errors
    /// This function errors if there are no images, the reader fails or the command is empty.
    pub fn from_reader(kind: JobKind, mut reader: impl Read, images: Vec<String>) -> Result<Self, JobError> {
        if images.is_empty() { return Err(JobError::MissingImages{ kind }); }
        let mut command: String = String::new();
        if let Err(err) = reader.read_to_string(&mut command) { return Err(JobError::StdinReadError{ err }); }
        Self::new(kind, command, images)
    }

    /// Constructor for the CommandJob that uses the contents of the given file as command.
    ///
    /// # Errors
    /// This function errors if there are no images, the file cannot be read or it is empty.
    pub fn from_path(kind: JobKind, path: impl AsRef<Path>, images: Vec<String>) -> Result<Self, JobError> {
        let path: &Path = path.as_ref();
        if images.is_empty() { return Err(JobError::MissingImages{ kind }); }
        let command: String = match fs::read_to_string(path) {
            Ok(command) => command,
            Err(err)    => { return Err(JobError::ScriptReadError{ path: path.into(), err }); },
        };
        Self::new(kind, command, images)
    }



    /// Returns the number of lines the given image has output so far.
    #[inline]
    pub fn lines(&self, vm: &str) -> usize { self.lines.get(vm).copied().unwrap_or(0) }

    /// Returns the number of lines all images have output so far.
    #[inline]
    pub fn total_lines(&self) -> usize { self.lines.values().sum() }

    /// Renders the line counts as a table.
    pub fn summary(&self) -> Table {
        let format = FormatBuilder::new()
            .column_separator('\0')
            .borders('\0')
            .padding(1, 1)
            .build();
        let mut table = Table::new();
        table.set_format(format);
        table.add_row(Row::new(vec![ Cell::new("IMAGE"), Cell::new("LINES") ]));
        for image in &self.images {
            table.add_row(Row::new(vec![ Cell::new(image), Cell::new(&self.lines(image).to_string()) ]));
        }
        table
    }
}

impl Job for CommandJob {
    #[inline]
    fn images(&self) -> &[String] { &self.images }

    #[inline]
    fn command(&self) -> &str { &self.command }

    #[inline]
    fn process(&mut self, output: VmOutput) {
        *self.lines.entry(output.vm).or_insert(0) += 1;
    }

    fn done(&mut self) {
        println!("Output of '{}' job per image:", self.kind);
        println!("{}", self.summary());
    }
}
