//  BUILD JOB.rs
//
//  Created:
//    08 Feb 2023, 14:20:51
//  Last edited:
//    21 Feb 2023, 11:31:06
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the jobs that build a falcosecurity driver (eBPF probe or
//!   kernel module) in every VM and report per stage whether it worked.
//

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use prettytable::format::FormatBuilder;
use prettytable::{Cell, Row, Table};

use crate::errors::JobError;
use crate::spec::{Job, JobKind, VmOutput};


/***** TESTS *****/





/***** CONSTANTS *****/
/// The prefix of the lines with which the build script reports the result of a stage.
pub const RESULT_MARKER: &str = "VMSPINNER_RESULT";

/// The commit of the libs repository that is built if the user does not say otherwise.
pub const DEFAULT_COMMIT: &str = "master";

/// The repository that is built.
pub const LIBS_REPO: &str = "https://github.com/falcosecurity/libs.git";

/// The images that are built on if the user does not say otherwise.
pub const DEFAULT_IMAGES: &[&str] = &[
    "centos/7",
    "generic/centos8",
    "generic/debian10",
    "generic/debian11",
    "generic/fedora35",
    "generic/fedora36",
    "generic/ubuntu1804",
    "generic/ubuntu2004",
    "generic/ubuntu2204",
    "generic/arch",
];

/// Installs the build dependencies with whatever package manager the VM has.
const INSTALL_DEPS: &str = r#"install_deps() {
    if command -v apt-get >/dev/null 2>&1; then
        sudo apt-get update -qq
        sudo DEBIAN_FRONTEND=noninteractive apt-get install -y -qq git cmake make gcc g++ clang llvm libelf-dev "linux-headers-$(uname -r)"
    elif command -v dnf >/dev/null 2>&1; then
        sudo dnf install -y -q git cmake make gcc gcc-c++ clang llvm elfutils-libelf-devel "kernel-devel-$(uname -r)"
    elif command -v yum >/dev/null 2>&1; then
        sudo yum install -y -q git cmake make gcc gcc-c++ clang llvm elfutils-libelf-devel "kernel-devel-$(uname -r)"
    elif command -v pacman >/dev/null 2>&1; then
        sudo pacman -Sy --noconfirm --needed git cmake make gcc clang llvm libelf linux-headers
    fi
}"#;





/***** HELPER FUNCTIONS *****/
/// Parses a result marker line.
///
/// # Returns
/// The stage and its outcome, or None if this is not a (valid) marker.
fn parse_marker(line: &str) -> Option<(&str, Outcome)> {
    let mut parts = line.split_whitespace();
    if parts.next()? != RESULT_MARKER { return None; }
    let stage: &str = parts.next()?;
    let outcome: Outcome = match parts.next()? {
        "ok"   => Outcome::Ok,
        "fail" => Outcome::Failed,
        _      => { return None; },
    };
    if parts.next().is_some() { return None; }
    Some((stage, outcome))
}

/// Checks whether the given commit can be safely pasted in a shell script.
fn is_valid_commit(commit: &str) -> bool {
    !commit.is_empty()
        && !commit.starts_with('-')
        && commit.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' || c == '/')
}

/// Generates the script that builds and tests the driver.
///
/// # Arguments
/// - `kind`: Whether to build the eBPF probe or the kernel module. Should be one of the build kinds.
/// - `commit`: The commit of the libs repository to build.
fn build_script(kind: JobKind, commit: &str) -> String {
    let (configure, target, test_stage, test): (&str, &str, &str, &str) = match kind {
        JobKind::Kmod => (
            "cmake -DUSE_BUNDLED_DEPS=ON -DBUILD_DRIVER=ON -DBUILD_BPF=OFF ..",
            "driver",
            "load",
            "sudo insmod driver/scap.ko && sudo rmmod scap",
        ),
        _ => (
            "cmake -DUSE_BUNDLED_DEPS=ON -DBUILD_DRIVER=OFF -DBUILD_BPF=ON ..",
            "bpf",
            "verify",
            "sudo mkdir -p /sys/fs/bpf && sudo bpftool prog loadall driver/bpf/probe.o /sys/fs/bpf/vmspinner && sudo rm -rf /sys/fs/bpf/vmspinner",
        ),
    };

    format!(r#"set -o pipefail
{install_deps}
install_deps >/dev/null 2>&1
rm -rf libs
if ! (git clone -q {repo} libs && cd libs && git checkout -q {commit}); then
    echo "{marker} build fail"
    exit 1
fi
mkdir -p libs/build && cd libs/build
if {configure} && make {target}; then
    echo "{marker} build ok"
else
    echo "{marker} build fail"
    exit 1
fi
if {test}; then
    echo "{marker} {test_stage} ok"
else
    echo "{marker} {test_stage} fail"
    exit 1
fi
"#,
        install_deps = INSTALL_DEPS,
        repo = LIBS_REPO,
        marker = RESULT_MARKER,
    )
}





/***** LIBRARY *****/
/// The outcome of a single stage in a single VM.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The stage succeeded.
    Ok,
    /// The stage failed.
    Failed,
}



/// Builds a falcosecurity driver in every VM.
#[derive(Debug)]
pub struct BuildJob {
    /// Whether this builds the eBPF probe or the kernel module.
    kind    : JobKind,
    /// The commit that is built.
    commit  : String,
    /// The images to build on.
    images  : Vec<String>,
    /// The build script.
    command : String,

    /// The outcomes reported so far, per image and then per stage.
    results : HashMap<String, BTreeMap<&'static str, Outcome>>,
}

impl BuildJob {
    /// Constructor for the BuildJob.
    ///
    /// # Arguments
    /// - `kind`: Either `JobKind::Bpf` or `JobKind::Kmod`.
    /// - `commit`: The commit of the libs repository to build. Uses `DEFAULT_COMMIT` if omitted.
    /// - `images`: The images to build on. Uses `DEFAULT_IMAGES` if empty.
    ///
    /// # Returns
    /// A new BuildJob instance.
    ///
    /// # Errors
    /// This function errors if the commit is not something we can safely put in a script.
    pub fn new(kind: JobKind, commit: Option<String>, images: Vec<String>) -> Result<Self, JobError> {
        let commit: String = commit.unwrap_or_else(|| DEFAULT_COMMIT.into());
        if !is_valid_commit(&commit) { return Err(JobError::IllegalCommit{ kind, commit }); }

        let images: Vec<String> = if images.is_empty() {
            debug!("No images given; building on {} default images", DEFAULT_IMAGES.len());
            DEFAULT_IMAGES.iter().map(|i| i.to_string()).collect()
        } else {
            images
        };

        let command: String = build_script(kind, &commit);
        Ok(Self {
            kind,
            commit,
            images,
            command,

            results : HashMap::new(),
        })
    }



    /// Returns the stages this job reports on, in order.
    pub fn stages(&self) -> &'static [&'static str] {
        match self.kind {
            JobKind::Kmod => &[ "build", "load" ],
            _             => &[ "build", "verify" ],
        }
    }

    /// Returns the commit that is built.
    #[inline]
    pub fn commit(&self) -> &str { &self.commit }

    /// Returns the reported outcome of the given stage on the given image, if any.
    pub fn outcome(&self, vm: &str, stage: &str) -> Option<Outcome> {
        self.results.get(vm).and_then(|stages| stages.get(stage)).copied()
    }

    /// Renders the results as a table of images by stages.
    pub fn summary(&self) -> Table {
        let format = FormatBuilder::new()
            .column_separator('\0')
            .borders('\0')
            .padding(1, 1)
            .build();
        let mut table = Table::new();
        table.set_format(format);

        let mut header: Vec<Cell> = vec![ Cell::new("IMAGE") ];
        header.extend(self.stages().iter().map(|s| Cell::new(&s.to_uppercase())));
        table.add_row(Row::new(header));

        for image in &self.images {
            let mut row: Vec<Cell> = vec![ Cell::new(image) ];
            for stage in self.stages() {
                row.push(Cell::new(match self.outcome(image, stage) {
                    Some(Outcome::Ok)     => "ok",
                    Some(Outcome::Failed) => "FAIL",
                    None                  => "-",
                }));
            }
            table.add_row(Row::new(row));
        }
        table
    }
}

impl Job for BuildJob {
    #[inline]
    fn images(&self) -> &[String] { &self.images }

    #[inline]
    fn command(&self) -> &str { &self.command }

    fn process(&mut self, output: VmOutput) {
        let (stage, outcome): (&str, Outcome) = match parse_marker(&output.line) {
            Some(res) => res,
            None      => { return; },
        };
        let stage: &'static str = match self.stages().iter().copied().find(|s| *s == stage) {
            Some(stage) => stage,
            None        => { warn!("VM '{}' reported result for unknown stage '{}'", output.vm, stage); return; },
        };

        debug!("VM '{}' reported stage '{}' as {:?}", output.vm, stage, outcome);
        self.results.entry(output.vm).or_default().insert(stage, outcome);
    }

    fn done(&mut self) {
        println!("Results of building the {} driver at commit '{}':", self.kind, self.commit);
        println!("{}", self.summary());
    }
}
