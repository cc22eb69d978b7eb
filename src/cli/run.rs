//! Command dispatcher.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use super::args::{Arguments, Command, CommonArgs, FilesCommand, PrintConfigCommand};
use super::exit_status::ExitStatus;
use crate::cascade::CascadingConfigFactory;
use crate::enumerate::{EnumeratorOptions, FileEnumerator, FileFlag};
use crate::factory::ConfigArrayFactory;
use crate::ignore::PatternIgnore;

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Command::PrintConfig(cmd) => print_config(cmd),
        Command::Files(cmd) => files(cmd),
    }
}

fn resolve_cwd(common: &CommonArgs) -> Result<PathBuf> {
    match &common.cwd {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid --cwd: {}", dir.display())),
        None => std::env::current_dir().context("Cannot determine the working directory"),
    }
}

fn build_enumerator(common: &CommonArgs, cwd: &PathBuf) -> Result<FileEnumerator> {
    let mut cascade = CascadingConfigFactory::new(ConfigArrayFactory::new(cwd));
    if common.personal {
        cascade = cascade.use_personal_config();
    }
    let ignore = PatternIgnore::new(cwd, &common.ignore_pattern)?;

    let enumerator = FileEnumerator::new(
        cascade,
        Box::new(ignore),
        EnumeratorOptions {
            extensions: common.ext.clone(),
            base_config: None,
            cli_config: None,
            config_file: common.config.clone(),
            use_rc: !common.no_rc,
        },
    )?;
    Ok(enumerator)
}

fn print_config(cmd: PrintConfigCommand) -> Result<ExitStatus> {
    let cwd = resolve_cwd(&cmd.common)?;
    let enumerator = build_enumerator(&cmd.common, &cwd)?;

    let target = std::path::absolute(cwd.join(&cmd.file))?;
    let array = enumerator.config_for_file(&target)?;

    if cmd.common.verbose {
        for element in array.elements() {
            let source = if element.file_path.as_os_str().is_empty() {
                "in-memory".to_string()
            } else {
                element.file_path.display().to_string()
            };
            eprintln!("{} {} ({})", "using:".bold().cyan(), element.name, source);
        }
    }

    let resolved = array
        .extract_config(&target)
        .with_context(|| format!("Failed to resolve configuration for {}", target.display()))?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(ExitStatus::Success)
}

fn files(cmd: FilesCommand) -> Result<ExitStatus> {
    let cwd = resolve_cwd(&cmd.common)?;
    let enumerator = build_enumerator(&cmd.common, &cwd)?;

    let entries = enumerator.iterate(&cmd.patterns)?;
    if entries.is_empty() {
        eprintln!(
            "{} no files matched the provided patterns",
            "warning:".bold().yellow()
        );
        return Ok(ExitStatus::Failure);
    }

    for entry in &entries {
        match entry.flag {
            FileFlag::None => println!("{}", entry.path.display()),
            FileFlag::Ignored => {
                println!("{} {}", entry.path.display(), "(ignored)".yellow())
            }
            FileFlag::Warning => println!(
                "{} {}",
                entry.path.display(),
                "(ignored, but explicitly requested)".yellow()
            ),
        }
    }

    if cmd.common.verbose {
        let mut seen = HashSet::new();
        for entry in &entries {
            for element in entry.config.elements() {
                if !element.file_path.as_os_str().is_empty()
                    && seen.insert(element.file_path.clone())
                {
                    eprintln!("{} {}", "config:".bold().cyan(), element.file_path.display());
                }
            }
        }
    }

    Ok(ExitStatus::Success)
}
