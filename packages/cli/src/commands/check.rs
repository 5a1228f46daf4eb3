use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use richtext_converter::{upcast, Recovery};
use richtext_editor::{CleanupEngine, CleanupReport};
use richtext_model::Model;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input XML document or directory
    pub input: PathBuf,

    /// Also list clean files and input repairs
    #[arg(long)]
    pub all: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    path: PathBuf,
    violations: Vec<CleanupReport>,
    recoveries: Vec<Recovery>,
}

impl FileReport {
    fn removed(&self) -> usize {
        self.violations.iter().map(|v| v.removed.len()).sum()
    }
}

pub fn check(args: CheckArgs, config: &Config) -> Result<bool> {
    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_xml_files(&args.input)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let engine = CleanupEngine::new(Arc::new(config.policy()?));
    let reports = files
        .iter()
        .map(|file| check_file(file, config, &engine))
        .collect::<Result<Vec<_>>>()?;
    let removed: usize = reports.iter().map(FileReport::removed).sum();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(removed == 0);
    }

    for report in &reports {
        print_report(report, args.all);
    }
    println!();
    println!("   Files checked: {}", reports.len());
    if removed > 0 {
        println!("   {} {}", "Disallowed values:".red(), removed);
    } else {
        println!("   {} No disallowed values", "✓".green());
    }
    Ok(removed == 0)
}

// Runs on a bare model: an editing session would already have cleaned the
// block holding the initial selection.
fn check_file(path: &Path, config: &Config, engine: &CleanupEngine) -> Result<FileReport> {
    let source = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut model = Model::new();
    let report = upcast(&mut model, &source, &config.editor_config()?.conversion_options())
        .with_context(|| format!("cannot load {}", path.display()))?;
    let violations = engine.clean_all(&mut model)?;
    Ok(FileReport {
        path: path.to_path_buf(),
        violations,
        recoveries: report.recoveries,
    })
}

fn print_report(report: &FileReport, all: bool) {
    if report.violations.is_empty() && !(all && !report.recoveries.is_empty()) {
        if all {
            println!("{} {}", "✓".green(), report.path.display());
        }
        return;
    }

    println!("{}", report.path.display());
    for violation in &report.violations {
        println!(
            "  {} <{}> {}",
            "removed".red().bold(),
            violation.config_name,
            violation.removed.join(", ")
        );
    }
    if all {
        for recovery in &report.recoveries {
            println!("  {} <{}> {}", "repaired".yellow().bold(), recovery.element, recovery.detail);
        }
    }
}

fn find_xml_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "xml"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const POLICY: &str = r#"{
        "customAttributes": { "paragraph": { "data-level": { "type": "number" } } },
        "customClasses": { "paragraph": { "choices": ["lead"] } }
    }"#;

    fn setup(doc: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("policy.json"), POLICY).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.xml"), doc).unwrap();
        fs::write(dir.path().join("docs/notes.txt"), "not a document").unwrap();
        let config = Config {
            policy: Some(dir.path().join("policy.json")),
            ..Config::default()
        };
        (dir, config)
    }

    #[test]
    fn test_reports_disallowed_values() {
        let (dir, config) = setup(
            r#"<section>
  <para ezxhtml:class="lead" ezattribute:data-level="two">first</para>
  <para ezxhtml:class="lead" ezattribute:data-level="2">ok</para>
  <para ezxhtml:class="shout" ezattribute:data-level="high">bad</para>
</section>"#,
        );

        let engine = CleanupEngine::new(Arc::new(config.policy().unwrap()));

        let report = check_file(&dir.path().join("docs/a.xml"), &config, &engine).unwrap();

        assert_eq!(report.violations.len(), 2);
        assert_eq!(report.removed(), 3);
        assert_eq!(report.violations[0].config_name, "paragraph");
        assert_eq!(report.violations[0].removed, vec!["custom-attribute:data-level".to_string()]);
    }

    #[test]
    fn test_directory_only_checks_xml() {
        let (dir, config) = setup("<section><para>plain</para></section>");

        let files = find_xml_files(dir.path());
        assert_eq!(files, vec![dir.path().join("docs/a.xml")]);

        let ok = check(
            CheckArgs {
                input: dir.path().join("docs"),
                all: true,
                format: "json".to_string(),
            },
            &config,
        )
        .unwrap();
        assert!(ok);
    }
}
