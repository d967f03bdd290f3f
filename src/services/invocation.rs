use crate::models::ExportJob;
use camino::{Utf8Path, Utf8PathBuf};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use thiserror::Error;

/// Errors raised while assembling a processor command
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("No input file given")]
    MissingInput,

    #[error("No export targets enabled")]
    NoExportTargets,

    #[error("Failed to write script {path}: {source}")]
    Script {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A program plus its argument list.
///
/// Arguments are passed to the process verbatim. [`Invocation::command_line`]
/// renders them for logs and scripts, quoting where needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Single-line rendering, e.g. `rpdx -i "my model.obj" ... -r`
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Shell a persisted script is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptShell {
    /// POSIX `sh`, run as `sh <script>`
    Sh,
    /// Windows `cmd`, run as `cmd /C <script>`
    Cmd,
}

impl ScriptShell {
    /// The shell scripts run under on this platform
    pub fn native() -> Self {
        if cfg!(windows) { Self::Cmd } else { Self::Sh }
    }

    /// Quote one argument so the shell passes it through unchanged.
    ///
    /// Words made only of path-safe characters stay bare. For `sh` anything
    /// else is single-quoted with `'` written as `'\''`. For `cmd` it is
    /// double-quoted, which makes `&|<>()^` literal, and `%` is doubled
    /// since batch files expand it even inside quotes.
    pub fn quote(self, arg: &str) -> Cow<'_, str> {
        let bare = |c: char| c.is_ascii_alphanumeric() || "_-./:".contains(c);
        match self {
            Self::Sh if !arg.is_empty() && arg.chars().all(|c| bare(c) || c == '@' || c == '+') => {
                Cow::Borrowed(arg)
            }
            Self::Sh => Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''"))),
            Self::Cmd if !arg.is_empty() && arg.chars().all(|c| bare(c) || c == '\\') => Cow::Borrowed(arg),
            Self::Cmd => Cow::Owned(format!("\"{}\"", arg.replace('%', "%%").replace('"', "\\\""))),
        }
    }

    fn render(self, invocation: &Invocation) -> String {
        let line = std::iter::once(invocation.program.as_str())
            .chain(invocation.args.iter().map(String::as_str))
            .map(|arg| self.quote(arg))
            .collect::<Vec<_>>()
            .join(" ");
        match self {
            Self::Sh => format!("#!/bin/sh\n{}\n", line),
            Self::Cmd => format!("@echo off\r\n{}\r\n", line),
        }
    }

    /// The invocation that executes a script written for this shell
    pub fn invocation(self, script: &Utf8Path) -> Invocation {
        match self {
            Self::Sh => Invocation::new("sh", vec![script.to_string()]),
            Self::Cmd => Invocation::new("cmd", vec!["/C".to_string(), script.to_string()]),
        }
    }
}

/// Double-quote an argument containing whitespace or quotes, for display
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return Cow::Borrowed(arg);
    }
    Cow::Owned(format!("\"{}\"", arg.replace('"', "\\\"")))
}

/// Strip trailing path separators, keeping a bare root intact
fn trim_separators(path: &Utf8Path) -> String {
    let s = path.as_str();
    let trimmed = s.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() { s.to_string() } else { trimmed.to_string() }
}

/// Builds `<processor> -i <input> (--read_config <cfg> -e <outdir>)* -r`
///
/// # Example
/// ```ignore
/// let invocation = InvocationBuilder::new("rpdx")
///     .input("a.obj")
///     .export("c1.json", "o1")
///     .build()?;
/// assert_eq!(invocation.command_line(), "rpdx -i a.obj --read_config c1.json -e o1 -r");
/// ```
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    program: String,
    input: Option<Utf8PathBuf>,
    exports: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

impl InvocationBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            input: None,
            exports: Vec::new(),
        }
    }

    /// Builder preloaded with a job's input and its targets in command order
    pub fn for_job(program: impl Into<String>, job: &ExportJob) -> Self {
        job.targets.iter().fold(
            Self::new(program).input(&job.entry.path),
            |builder, target| builder.export(&target.config_path, &target.output_dir),
        )
    }

    pub fn input(mut self, path: impl AsRef<Utf8Path>) -> Self {
        self.input = Some(path.as_ref().to_path_buf());
        self
    }

    /// Append one `--read_config <config> -e <output_dir>` pair
    pub fn export(mut self, config: impl AsRef<Utf8Path>, output_dir: impl AsRef<Utf8Path>) -> Self {
        self.exports
            .push((config.as_ref().to_path_buf(), output_dir.as_ref().to_path_buf()));
        self
    }

    pub fn build(self) -> Result<Invocation, InvocationError> {
        let input = self.input.ok_or(InvocationError::MissingInput)?;
        if self.exports.is_empty() {
            return Err(InvocationError::NoExportTargets);
        }

        let mut args = vec!["-i".to_string(), input.to_string()];
        for (config, output_dir) in &self.exports {
            args.push("--read_config".to_string());
            args.push(config.to_string());
            args.push("-e".to_string());
            args.push(trim_separators(output_dir));
        }
        args.push("-r".to_string());

        let invocation = Invocation::new(self.program, args);
        tracing::debug!("Built command: {}", invocation);
        Ok(invocation)
    }
}

/// Persist the command line into a script and return the invocation that runs it.
///
/// Windows scripts run through `cmd /C`, others through `sh`. Every argument
/// is quoted for the target shell.
pub fn write_script(invocation: &Invocation, path: &Utf8Path) -> Result<Invocation, InvocationError> {
    let shell = ScriptShell::native();
    fs::write(path, shell.render(invocation)).map_err(|source| InvocationError::Script {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Wrote script: {}", path);

    Ok(shell.invocation(path))
}

/// The invocation that executes a script written by [`write_script`]
pub fn script_invocation(path: &Utf8Path) -> Invocation {
    ScriptShell::native().invocation(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_two_target_command() {
        let invocation = InvocationBuilder::new("rpdx")
            .input("a.obj")
            .export("c1.json", "o1/")
            .export("c2.json", "o2/")
            .build()
            .unwrap();

        assert_eq!(
            invocation.args,
            vec!["-i", "a.obj", "--read_config", "c1.json", "-e", "o1", "--read_config", "c2.json", "-e", "o2", "-r"]
        );
        assert_eq!(
            invocation.command_line(),
            "rpdx -i a.obj --read_config c1.json -e o1 --read_config c2.json -e o2 -r"
        );
    }

    #[test]
    fn test_quoting_only_in_rendering() {
        let invocation = InvocationBuilder::new("rpdx")
            .input("/my models/a.obj")
            .export("/my models/c.json", "/my models/out")
            .build()
            .unwrap();

        assert_eq!(invocation.args[1], "/my models/a.obj");
        assert!(invocation.command_line().contains("-i \"/my models/a.obj\""));
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg("has space"), "\"has space\"");
        assert_eq!(quote_arg("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_arg(""), "\"\"");
    }

    #[test]
    fn test_trim_separators_keeps_root() {
        assert_eq!(trim_separators(Utf8Path::new("out\\")), "out");
        assert_eq!(trim_separators(Utf8Path::new("/")), "/");
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            InvocationBuilder::new("rpdx").export("c.json", "o").build(),
            Err(InvocationError::MissingInput)
        ));
        assert!(matches!(
            InvocationBuilder::new("rpdx").input("a.obj").build(),
            Err(InvocationError::NoExportTargets)
        ));
    }

    #[test]
    fn test_write_script() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let script = root.join("a_convert.sh");

        let invocation = InvocationBuilder::new("rpdx")
            .input("a.obj")
            .export("c.json", "o")
            .build()
            .unwrap();
        let runner = write_script(&invocation, &script).unwrap();

        let body = fs::read_to_string(&script).unwrap();
        assert!(body.contains("rpdx -i a.obj --read_config c.json -e o -r"));
        assert_eq!(runner.args.last().map(String::as_str), Some(script.as_str()));
    }

    #[test]
    fn test_sh_quoting_neutralizes_shell_syntax() {
        let sh = ScriptShell::Sh;
        assert_eq!(sh.quote("/data/dirlod/a/glb"), "/data/dirlod/a/glb");
        assert_eq!(sh.quote("/my models/a.obj"), "'/my models/a.obj'");
        assert_eq!(sh.quote("/data/bob's.obj"), r"'/data/bob'\''s.obj'");
        assert_eq!(sh.quote("a&b.obj"), "'a&b.obj'");
        assert_eq!(sh.quote("$(rm -rf x);.obj"), "'$(rm -rf x);.obj'");
        assert_eq!(sh.quote(""), "''");
    }

    #[test]
    fn test_cmd_quoting() {
        let cmd = ScriptShell::Cmd;
        assert_eq!(cmd.quote(r"C:\data\dirlod\a\glb"), r"C:\data\dirlod\a\glb");
        assert_eq!(cmd.quote(r"C:\my models\a&b.obj"), r#""C:\my models\a&b.obj""#);
        assert_eq!(cmd.quote(r"C:\data\100%.obj"), r#""C:\data\100%%.obj""#);
        assert_eq!(cmd.quote("x^y(1).obj"), r#""x^y(1).obj""#);
    }

    #[test]
    fn test_rendered_scripts() {
        let invocation = InvocationBuilder::new("rpdx")
            .input("/in/bob's.obj")
            .export("/in/dirlod/bob's/c.json", "/in/dirlod/bob's/glb")
            .build()
            .unwrap();

        let sh = ScriptShell::Sh.render(&invocation);
        assert_eq!(
            sh,
            "#!/bin/sh\nrpdx -i '/in/bob'\\''s.obj' --read_config '/in/dirlod/bob'\\''s/c.json' \
             -e '/in/dirlod/bob'\\''s/glb' -r\n"
        );

        let cmd = ScriptShell::Cmd.render(&invocation);
        assert!(cmd.starts_with("@echo off\r\n"));
        assert!(cmd.contains(r#"-i "/in/bob's.obj""#));
        assert!(cmd.ends_with(" -r\r\n"));
    }

    #[test]
    fn test_script_invocation_per_shell() {
        let script = Utf8Path::new("/out/a_convert.sh");
        assert_eq!(ScriptShell::Sh.invocation(script).program, "sh");
        assert_eq!(
            ScriptShell::Cmd.invocation(script).args,
            vec!["/C".to_string(), script.to_string()]
        );
    }
}
