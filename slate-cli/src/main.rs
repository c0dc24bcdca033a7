use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use slate_core::{CompileOptions, compile};

/// コマンドライン引数を定義するための構造体
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Path of the generated C file
    #[arg(short, long)]
    output: String,

    /// Annotate the generated C with source line comments
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let (source, display_name) = match &cli.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {path}"))?;
            (text, path.clone())
        }
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            (buffer, String::from("<stdin>"))
        }
    };

    let options = CompileOptions { debug: cli.debug };
    match compile(&source, options) {
        Ok(artifact) => {
            for warning in &artifact.warnings {
                eprintln!("{}", warning.render(&display_name, &source));
            }
            write_output(&cli.output, artifact.c_source.as_bytes())
        }
        Err(err) => {
            for diagnostic in err.diagnostics() {
                eprintln!("{}", diagnostic.render(&display_name, &source));
            }
            Err(err.into())
        }
    }
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn compiles_a_program_to_c() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(&input_path, "program demo is begin end program").expect("write input");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        let c = fs::read_to_string(&output_path).expect("read output");
        assert!(c.contains("int main(void)"));
    }

    #[test]
    fn reads_source_from_stdin() {
        let dir = tempdir().expect("tempdir");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .write_stdin("program piped is begin end program")
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        assert!(output_path.exists(), "C output was not created");
    }

    #[test]
    fn reports_syntax_errors_with_positions() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(&input_path, "program broken is\nbegin\n  x := ;\nend program")
            .expect("write input");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("error[E0101]"))
            .stderr(predicate::str::contains("input.slate:3:"));

        assert!(!output_path.exists(), "no output should be written on failure");
    }

    #[test]
    fn reports_semantic_errors_with_their_code() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(&input_path, "program p is begin x := 1; end program").expect("write input");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("error[E0202]"))
            .stderr(predicate::str::contains("undeclared"));
    }

    #[test]
    fn debug_flag_adds_line_comments() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(
            &input_path,
            "program traced is\ninteger x;\nbegin\n  x := 1;\nend program",
        )
        .expect("write input");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--debug")
            .assert()
            .success();

        let c = fs::read_to_string(&output_path).expect("read output");
        assert!(c.contains("/* line 4 */"));
    }

    #[test]
    fn warnings_do_not_fail_the_build() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(&input_path, "program p is begin end program leftover")
            .expect("write input");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success()
            .stderr(predicate::str::contains("warning"));

        assert!(output_path.exists(), "C output was not created");
    }

    #[test]
    fn creates_missing_output_directories() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("input.slate");
        fs::write(&input_path, "program nested is begin end program").expect("write input");
        let output_path = dir.path().join("build").join("out").join("nested.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .assert()
            .success();

        assert!(output_path.exists(), "nested output path was not created");
    }

    #[test]
    fn reports_missing_input_file() {
        let dir = tempdir().expect("tempdir");
        let output_path = dir.path().join("out.c");

        Command::cargo_bin("slate-cli")
            .expect("binary exists")
            .arg("--input")
            .arg(dir.path().join("missing.slate"))
            .arg("--output")
            .arg(&output_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read input file"));
    }
}
