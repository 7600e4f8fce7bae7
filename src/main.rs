pub mod models {
    pub mod campus;
}

pub mod config;
pub mod loader;
pub mod presentation;
pub mod selection;
pub mod shell;
pub mod services {
    pub mod demo_data;
    pub mod pipeline;
}

use crate::config::{Config, OutputFormat};
use crate::loader::{Dataset, Datasets};
use crate::selection::Selection;
use crate::services::demo_data;
use crate::shell::{Shell, ShellError};
use log::{error, info, warn};
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    /// Render the initial selection and exit instead of reading commands.
    once: bool,
    generate_demo_data: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = OsString>>(args: I) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg.into_string().map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<PathBuf, String> {
            let v = match inline.clone() {
                Some(v) => v,
                None => args
                    .next()
                    .and_then(|v| v.into_string().ok())
                    .ok_or_else(|| format!("`{}` requires a path argument", name))?,
            };
            if v.is_empty() {
                return Err(format!("`{}` requires a path argument", name));
            }
            Ok(PathBuf::from(v))
        };

        match flag.as_str() {
            "--env-file" => {
                if parsed.env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                parsed.env_file = Some(value("--env-file")?);
            }
            "--generate-demo-data" => {
                parsed.generate_demo_data = Some(value("--generate-demo-data")?);
            }
            "--once" if inline.is_none() => parsed.once = true,
            "--" => break,
            other => return Err(format!("unrecognised argument: {}", other)),
        }
    }

    Ok(parsed)
}

/// Apply the configured starting point on top of the default cascade.
fn initial_selection(data: &Datasets, cfg: &Config) -> Result<Selection, String> {
    let mut selection = Selection::initial(data);
    if let Some(choice) = &cfg.building {
        selection = selection
            .choose_building(data, choice)
            .map_err(|e| format!("STUDY_BUILDING: {}", e))?;
    }
    if let Some(choice) = &cfg.floor {
        selection = selection
            .choose_floor(data, choice)
            .map_err(|e| format!("STUDY_FLOOR: {}", e))?;
    }
    if let Some(choice) = &cfg.space_type {
        selection = selection
            .choose_space_type(choice)
            .map_err(|e| format!("STUDY_SPACE_TYPE: {}", e))?;
    }
    Ok(selection)
}

fn log_dangling_references(data: &Datasets) {
    let report = data.dangling_references();
    if report.is_empty() {
        return;
    }
    let join = |ids: Vec<String>| ids.join(", ");
    if !report.floors.is_empty() {
        warn!(
            "Ignoring {} floor(s) with unknown building: {}",
            report.floors.len(),
            join(report.floors.iter().map(|f| f.0.clone()).collect())
        );
    }
    if !report.spaces.is_empty() {
        warn!(
            "Ignoring {} space(s) with unknown floor: {}",
            report.spaces.len(),
            join(report.spaces.iter().map(|s| s.0.clone()).collect())
        );
    }
    if !report.occupancy.is_empty() {
        warn!(
            "Ignoring {} occupancy record(s) for unknown spaces: {}",
            report.occupancy.len(),
            join(report.occupancy.iter().map(|s| s.0.clone()).collect())
        );
    }
}

fn run(args: &CliArgs) -> Result<(), String> {
    if let Some(dir) = &args.generate_demo_data {
        return demo_data::run(dir);
    }

    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (data_dir={}, output={:?}, building={}, floor={}, space_type={})",
        cfg.data_dir.display(),
        cfg.output,
        cfg.building.as_deref().unwrap_or("-"),
        cfg.floor.as_deref().unwrap_or("-"),
        cfg.space_type.as_deref().unwrap_or("-")
    );

    // 2) Load datasets
    let data = Datasets::load_all(&cfg.data_dir).map_err(|e| e.to_string())?;
    info!(
        "Loaded datasets from {}: {}",
        cfg.data_dir.display(),
        Dataset::ALL
            .iter()
            .map(|d| format!("{}={}", d.file_name(), data.record_count(*d)))
            .collect::<Vec<_>>()
            .join(", ")
    );
    log_dangling_references(&data);
    if data.buildings.is_empty() {
        warn!("No buildings found; the dashboard will be empty");
    }

    // 3) Resolve the starting selection
    let selection = initial_selection(&data, &cfg)?;

    // 4) Serve the dashboard
    let mut shell = Shell::new(&data, selection, cfg.output);
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let served = if args.once {
        shell.render(&mut stdout).map_err(ShellError::Write)
    } else {
        let prompt = stdin.is_terminal() && cfg.output == OutputFormat::Text;
        shell.run(stdin.lock(), &mut stdout, prompt)
    };
    served.map_err(|e| e.to_string())
}

fn main() {
    let args = match parse_args(std::env::args_os().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };
    let loaded_env = match config::load_env_file(args.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "study-space-dashboard {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&args) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(OsString::from))
    }

    #[test]
    fn parses_flags() {
        assert_eq!(args(&[]).unwrap(), CliArgs::default());
        let parsed = args(&["--env-file", "prod.env", "--once"]).unwrap();
        assert_eq!(parsed.env_file, Some(PathBuf::from("prod.env")));
        assert!(parsed.once);
        let parsed = args(&["--generate-demo-data=out/data"]).unwrap();
        assert_eq!(parsed.generate_demo_data, Some(PathBuf::from("out/data")));
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(args(&["--env-file"]).is_err());
        assert!(args(&["--env-file="]).is_err());
        assert!(args(&["--env-file", "a", "--env-file", "b"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["--once=yes"]).is_err());
    }

    #[test]
    fn stops_at_double_dash() {
        let parsed = args(&["--once", "--", "--whatever"]).unwrap();
        assert!(parsed.once);
    }

    #[test]
    fn configured_selection_is_applied_in_cascade_order() {
        let data = Datasets::load_all(Path::new("tests/data")).unwrap();
        let cfg = Config {
            data_dir: PathBuf::from("tests/data"),
            building: Some("B1".into()),
            floor: Some("Level 2".into()),
            space_type: Some("pc".into()),
            output: OutputFormat::Json,
        };
        let sel = initial_selection(&data, &cfg).unwrap();
        assert_eq!(sel.floor_id.map(|f| f.0), Some("F2".to_string()));
        assert_eq!(sel.space_type, crate::models::campus::SpaceType::Pc);

        let bad = Config {
            floor: Some("F3".into()),
            ..cfg
        };
        let err = initial_selection(&data, &bad).unwrap_err();
        assert!(err.starts_with("STUDY_FLOOR: unknown floor"));
    }
}
