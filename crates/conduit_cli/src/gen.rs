//! `conduit gen`: write the sandbox declaration file

use anyhow::{bail, Context, Result};
use conduit_etch::ApiBuilder;
use std::path::PathBuf;

/// Run the gen command with the given arguments
pub fn run(args: &[String]) -> Result<()> {
    let cmd = GenCommand::parse(args)?;

    let mut builder = ApiBuilder::from_manifest(&cmd.project)
        .with_context(|| format!("loading conduit.toml in {}", cmd.project.display()))?;
    if let Some(src) = &cmd.src {
        builder = builder.src_dir(src);
    }
    if let Some(out) = &cmd.out {
        builder = builder.out_file(out);
    }

    if cmd.stdout {
        let (_, contents) = builder
            .generate()
            .with_context(|| format!("generating declarations for {}", builder.src_path().display()))?;
        print!("{}", contents);
        return Ok(());
    }

    let output = builder
        .build()
        .with_context(|| format!("writing {}", builder.out_path().display()))?;
    println!(
        "Generated {} ({} components, {} declarations)",
        output.out_file.display(),
        output.component_count(),
        output.declaration_count()
    );
    Ok(())
}

/// Gen command configuration
#[derive(Debug, PartialEq)]
struct GenCommand {
    /// Project root holding conduit.toml
    project: PathBuf,
    /// Overrides `[surface] src_dir`
    src: Option<PathBuf>,
    /// Overrides `[surface] out_file`
    out: Option<PathBuf>,
    /// Print instead of writing
    stdout: bool,
}

impl GenCommand {
    fn parse(args: &[String]) -> Result<Self> {
        let mut cmd = GenCommand {
            project: PathBuf::from("."),
            src: None,
            out: None,
            stdout: false,
        };

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--src" | "-s" => {
                    if i + 1 < args.len() {
                        cmd.src = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    } else {
                        bail!("--src requires a directory");
                    }
                }
                "--out" | "-o" => {
                    if i + 1 < args.len() {
                        cmd.out = Some(PathBuf::from(&args[i + 1]));
                        i += 2;
                    } else {
                        bail!("--out requires a file path");
                    }
                }
                "--stdout" => {
                    cmd.stdout = true;
                    i += 1;
                }
                arg if !arg.starts_with('-') => {
                    cmd.project = PathBuf::from(arg);
                    i += 1;
                }
                _ => {
                    bail!("Unknown flag: {}", args[i]);
                }
            }
        }

        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults() {
        let cmd = GenCommand::parse(&[]).unwrap();
        assert_eq!(cmd.project, PathBuf::from("."));
        assert_eq!(cmd.src, None);
        assert!(!cmd.stdout);
    }

    #[test]
    fn test_parse_flags() {
        let cmd = GenCommand::parse(&args(&["apps/notes", "-s", "web", "--out", "types/api.d.ts", "--stdout"])).unwrap();
        assert_eq!(
            cmd,
            GenCommand {
                project: PathBuf::from("apps/notes"),
                src: Some(PathBuf::from("web")),
                out: Some(PathBuf::from("types/api.d.ts")),
                stdout: true,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(GenCommand::parse(&args(&["--out"])).is_err());
        assert!(GenCommand::parse(&args(&["--watch"])).is_err());
    }

    #[test]
    fn test_run_writes_declarations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/clock.ts"),
            "@Component() export class Clock { @Expose() async now(): Promise<number> { return 0; } }",
        )
        .unwrap();

        run(&args(&[dir.path().to_str().unwrap()])).unwrap();
        let written = std::fs::read_to_string(dir.path().join(".conduit/api.d.ts")).unwrap();
        assert!(written.contains("    now(): Promise<number>;\n"));
        assert!(written.contains("    var clock: Clock;\n"));
    }

    #[test]
    fn test_run_without_tsconfig_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&args(&[dir.path().to_str().unwrap()])).unwrap_err();
        assert!(format!("{:#}", err).contains("tsconfig.json not found"));
    }
}
