//  LOGGING.rs
//
//  Created:
//    14 Feb 2023, 11:20:36
//  Last edited:
//    21 Feb 2023, 16:48:09
//  Auto updated?
//    Yes
//
//  Description:
//!   Installs the process-wide logger from the log configuration.
//

use std::fs::{File, OpenOptions};
use std::io::Write as _;

use chrono::Local;
use env_logger::{Target, WriteStyle};
use log::Record;
use serde_json::{json, Value};

use spinner_cfg::logging::LogConfig;

use crate::errors::CliError;


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Turns a log record into a JSON object.
fn json_record(record: &Record) -> Value {
    json!({
        "time"   : Local::now().to_rfc3339(),
        "level"  : record.level().to_string(),
        "target" : record.target(),
        "msg"    : record.args().to_string(),
    })
}





/***** LIBRARY *****/
/// Installs the logger for this process. May only be called once.
///
/// # Arguments
/// - `config`: The LogConfig that determines the level, format and destination of the records.
///
/// # Errors
/// This function errors if the log file could not be opened or if a logger was already installed.
pub fn init_logger(config: &LogConfig) -> Result<(), CliError> {
    let mut logger = env_logger::builder();
    logger.format_module_path(false);
    logger.filter_level(config.level.filter());

    if config.json {
        logger.format(|buf, record| writeln!(buf, "{}", json_record(record)));
    }

    match &config.output {
        Some(path) => {
            let file: File = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => file,
                Err(err) => { return Err(CliError::LogFileError{ path: path.clone(), err }); },
            };
            logger.target(Target::Pipe(Box::new(file)));
            logger.write_style(WriteStyle::Never);
        },
        None => { logger.target(Target::Stdout); },
    }

    match logger.try_init() {
        Ok(())   => Ok(()),
        Err(err) => Err(CliError::LoggerError{ err }),
    }
}
