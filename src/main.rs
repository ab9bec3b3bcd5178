mod app;
mod calendar;
mod datekey;
mod detail;
mod help;
mod jumpto;
mod record;
mod theme;
use crate::app::App;
use crate::calendar::{CalendarView, MonthCursor, DEFAULT_CAP};
use crate::datekey::LocalNow;
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run {
        path: PathBuf,
        month: Option<MonthCursor>,
        cap: usize,
        read_only: bool,
        log_file: Option<PathBuf>,
    },
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut path = None;
        let mut month = None;
        let mut cap = DEFAULT_CAP;
        let mut read_only = false;
        let mut log_file = None;
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Long("cap") => {
                    let value = parser.value()?.string()?;
                    cap = match value.parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        Ok(_) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: "must be at least 1".into(),
                            })
                        }
                        Err(e) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: Box::new(e),
                            })
                        }
                    };
                }
                Arg::Long("read-only") => read_only = true,
                Arg::Long("log-file") => log_file = Some(PathBuf::from(parser.value()?)),
                Arg::Value(value) if path.is_none() => path = Some(PathBuf::from(value)),
                Arg::Value(value) if month.is_none() => month = Some(value.parse()?),
                _ => return Err(arg.unexpected()),
            }
        }
        let path = path.ok_or("no appointments file given")?;
        Ok(Command::Run {
            path,
            month,
            cap,
            read_only,
            log_file,
        })
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run {
                path,
                month,
                cap,
                read_only,
                log_file,
            } => {
                let now = OffsetDateTime::now_local().context("failed to determine local time")?;
                if let Some(log_file) = log_file {
                    init_logging(&log_file)?;
                }
                let records = record::load(&path)?;
                tracing::info!(
                    path = %path.display(),
                    records = records.len(),
                    "loaded appointments"
                );
                let mut view =
                    CalendarView::new(&records, LocalNow::system(now), cap).read_only(read_only);
                if let Some(month) = month {
                    view.jump_to(month);
                }
                with_terminal(|mut terminal| {
                    terminal.hide_cursor().context("failed to hide cursor")?;
                    App::new(view).run(terminal)?;
                    Ok(())
                })
            }
            Command::Help => {
                println!("Usage: apptcal [<options>] <APPOINTMENTS.json> [YYYY-MM]");
                println!();
                println!("Month-view terminal calendar of patient/doctor appointments");
                println!();
                println!("Options:");
                println!("  --cap <N>         Show at most N appointments per day [default: {DEFAULT_CAP}]");
                println!("  --read-only       Mark the calendar as read-only");
                println!("  --log-file <PATH> Write diagnostic logs to the given file");
                println!("  -h, --help        Display this help message and exit");
                println!("  -V, --version     Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

/// Send logs to `path`, filtered by `RUST_LOG`.  The terminal belongs to the
/// calendar, so nothing is logged unless a file is given.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "apptcal=info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn parse(args: &[&str]) -> Result<Command, lexopt::Error> {
        Command::from_parser(Parser::from_args(args))
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            parse(&["appts.json"]).unwrap(),
            Command::Run {
                path: PathBuf::from("appts.json"),
                month: None,
                cap: DEFAULT_CAP,
                read_only: false,
                log_file: None,
            }
        );
    }

    #[test]
    fn test_all_options() {
        assert_eq!(
            parse(&[
                "--cap",
                "5",
                "--read-only",
                "--log-file",
                "cal.log",
                "appts.json",
                "2025-03"
            ])
            .unwrap(),
            Command::Run {
                path: PathBuf::from("appts.json"),
                month: Some(MonthCursor::new(2025, Month::March).unwrap()),
                cap: 5,
                read_only: true,
                log_file: Some(PathBuf::from("cal.log")),
            }
        );
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--cap", "0", "appts.json"]).is_err());
        assert!(parse(&["--cap", "many", "appts.json"]).is_err());
        assert!(parse(&["appts.json", "2025-13"]).is_err());
        assert!(parse(&["appts.json", "2025-03", "extra"]).is_err());
    }

    #[test]
    fn test_help_wins() {
        assert_eq!(parse(&["appts.json", "--help"]).unwrap(), Command::Help);
        assert_eq!(parse(&["-V"]).unwrap(), Command::Version);
    }
}
