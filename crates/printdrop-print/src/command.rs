// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print command construction.
//
// Turns (file, printer, options) into the exact argument vectors that make
// the host's print subsystem print the file.  Nothing here touches the OS:
// the result is plain data that an executor runs later.
//
// # Strategies
//
//   CUPS     `lp [-d PRINTER] [-o media=..] [-o sides=..] [-o fit-to-page] -- FILE`
//   Windows  images to a named printer go through the image viewer's
//            `ImageView_PrintTo`; everything else through PowerShell
//            `Start-Process -Verb Print|PrintTo`, preceded by
//            `Set-PrintConfiguration` when paper size or duplex is requested.
//
// Copies are always produced by repeating the invocation, never by a
// spooler-side copy count, so every file type and back-end behaves alike.

use std::fmt;
use std::path::Path;

use printdrop_core::types::{DocumentType, Platform, PrintOptions};

/// A single external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Where a print command sends its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintTarget {
    /// The OS default printer.
    Default,
    /// A printer selected by name.
    Named(String),
}

impl fmt::Display for PrintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Everything needed to print one file: the target, the invocation, and how
/// many times to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    pub target: PrintTarget,
    pub invocation: CommandSpec,
    /// Always at least 1.
    pub copies: u32,
}

/// Builds print commands for one print back-end.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder {
    platform: Platform,
}

impl CommandBuilder {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Build the command that prints `file`.
    ///
    /// Options are expected to have passed `PrintOptions::validate`.
    ///
    /// A blank `printer` counts as "no printer": the OS default is used.
    pub fn build(&self, file: &Path, printer: Option<&str>, options: &PrintOptions) -> PrintCommand {
        let target = match printer.map(str::trim) {
            Some(name) if !name.is_empty() => PrintTarget::Named(name.to_owned()),
            _ => PrintTarget::Default,
        };
        let document_type = DocumentType::from_path(file);

        let invocation = match self.platform {
            Platform::Cups => cups_invocation(file, &target, options, document_type),
            Platform::Windows => windows_invocation(file, &target, options, document_type),
        };

        PrintCommand {
            target,
            invocation,
            copies: options.effective_copies(),
        }
    }
}

fn cups_invocation(
    file: &Path,
    target: &PrintTarget,
    options: &PrintOptions,
    document_type: Option<DocumentType>,
) -> CommandSpec {
    let mut cmd = CommandSpec::new("lp");
    if let PrintTarget::Named(name) = target {
        cmd = cmd.arg("-d").arg(name.as_str());
    }
    if let Some(size) = options.explicit_paper_size() {
        cmd = cmd.arg("-o").arg(format!("media={}", size.cups_media()));
    }
    if let Some(mode) = options.explicit_duplex() {
        cmd = cmd.arg("-o").arg(format!("sides={}", mode.cups_sides()));
    }
    if document_type.is_some_and(|t| t.is_image()) {
        cmd = cmd.arg("-o").arg("fit-to-page");
    }
    cmd.arg("--").arg(file.to_string_lossy())
}

fn windows_invocation(
    file: &Path,
    target: &PrintTarget,
    options: &PrintOptions,
    document_type: Option<DocumentType>,
) -> CommandSpec {
    let file = file.to_string_lossy();
    let paper = options.explicit_paper_size();
    let duplex = options.explicit_duplex();
    let is_image = document_type.is_some_and(|t| t.is_image());

    // The image viewer cannot take printer settings, so it is only used when
    // nothing needs configuring.
    if let PrintTarget::Named(name) = target
        && is_image
        && paper.is_none()
        && duplex.is_none()
    {
        return CommandSpec::new("rundll32.exe")
            .arg("shimgvw.dll,ImageView_PrintTo")
            .arg("/pt")
            .arg(file.into_owned())
            .arg(name.as_str());
    }

    let mut script = String::from("$ErrorActionPreference = 'Stop'; ");

    if paper.is_some() || duplex.is_some() {
        let printer_expr = match target {
            PrintTarget::Named(name) => ps_quote(name),
            PrintTarget::Default => {
                "(Get-CimInstance -ClassName Win32_Printer -Filter 'Default=TRUE').Name".to_owned()
            }
        };
        script.push_str(&format!("Set-PrintConfiguration -PrinterName {printer_expr}"));
        if let Some(size) = paper {
            script.push_str(&format!(" -PaperSize {}", size.windows_name()));
        }
        if let Some(mode) = duplex {
            script.push_str(&format!(" -DuplexingMode {}", mode.windows_mode()));
        }
        script.push_str("; ");
    }

    match target {
        PrintTarget::Default => {
            script.push_str(&format!(
                "Start-Process -FilePath {} -Verb Print -Wait",
                ps_quote(&file)
            ));
        }
        PrintTarget::Named(name) => {
            script.push_str(&format!(
                "Start-Process -FilePath {} -Verb PrintTo -ArgumentList {} -Wait",
                ps_quote(&file),
                ps_quote(&format!("\"{name}\""))
            ));
        }
    }

    powershell(script)
}

/// Wrap a PowerShell script in a non-interactive `powershell.exe` call.
pub(crate) fn powershell(script: impl Into<String>) -> CommandSpec {
    CommandSpec::new("powershell.exe")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script)
}

/// Quote a value as a PowerShell single-quoted literal.
pub(crate) fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdrop_core::types::{DuplexMode, PaperSize};

    fn cups() -> CommandBuilder {
        CommandBuilder::new(Platform::Cups)
    }

    fn windows() -> CommandBuilder {
        CommandBuilder::new(Platform::Windows)
    }

    fn joined(cmd: &CommandSpec) -> String {
        cmd.args.join(" ")
    }

    #[test]
    fn default_printer_cups_is_plain_lp() {
        let cmd = cups().build(Path::new("/srv/uploads/a.pdf"), None, &PrintOptions::default());
        assert_eq!(cmd.target, PrintTarget::Default);
        assert_eq!(cmd.copies, 1);
        assert_eq!(cmd.invocation.program, "lp");
        assert_eq!(cmd.invocation.args, vec!["--", "/srv/uploads/a.pdf"]);
    }

    #[test]
    fn named_printer_cups_uses_destination_flag() {
        let cmd = cups().build(Path::new("a.pdf"), Some("Office_Laser"), &PrintOptions::default());
        assert_eq!(cmd.target, PrintTarget::Named("Office_Laser".into()));
        assert_eq!(cmd.invocation.args[..2], ["-d", "Office_Laser"]);
    }

    #[test]
    fn blank_printer_name_means_default() {
        let cmd = cups().build(Path::new("a.pdf"), Some("  "), &PrintOptions::default());
        assert_eq!(cmd.target, PrintTarget::Default);
        assert!(!cmd.invocation.args.contains(&"-d".to_owned()));
    }

    #[test]
    fn three_copies_without_printer_issue_three_invocations() {
        let options = PrintOptions {
            copies: Some(3),
            ..Default::default()
        };
        for builder in [cups(), windows()] {
            let cmd = builder.build(Path::new("report.docx"), None, &options);
            assert_eq!(cmd.copies, 3);
            assert!(!cmd.invocation.args.iter().any(|a| a.contains("copies")));
        }
    }

    #[test]
    fn zero_copies_still_prints_once() {
        let options = PrintOptions {
            copies: Some(0),
            ..Default::default()
        };
        let cmd = cups().build(Path::new("a.txt"), None, &options);
        assert_eq!(cmd.copies, 1);
    }

    #[test]
    fn duplex_maps_to_long_edge() {
        let options = PrintOptions {
            duplex: Some(DuplexMode::LongEdge),
            ..Default::default()
        };
        let cmd = cups().build(Path::new("a.pdf"), None, &options);
        assert!(joined(&cmd.invocation).contains("-o sides=two-sided-long-edge"));

        let cmd = windows().build(Path::new("a.pdf"), None, &options);
        assert!(joined(&cmd.invocation).contains("-DuplexingMode TwoSidedLongEdge"));
    }

    #[test]
    fn tumble_maps_to_short_edge() {
        let options = PrintOptions {
            duplex: Some(DuplexMode::ShortEdge),
            ..Default::default()
        };
        let cmd = cups().build(Path::new("a.pdf"), Some("P1"), &options);
        assert!(joined(&cmd.invocation).contains("-o sides=two-sided-short-edge"));

        let cmd = windows().build(Path::new("a.pdf"), Some("P1"), &options);
        assert!(joined(&cmd.invocation).contains("-DuplexingMode TwoSidedShortEdge"));
    }

    #[test]
    fn simplex_or_missing_duplex_emits_no_flag() {
        for duplex in [None, Some(DuplexMode::Simplex)] {
            let options = PrintOptions {
                duplex,
                ..Default::default()
            };
            let cmd = cups().build(Path::new("a.pdf"), None, &options);
            assert!(!joined(&cmd.invocation).contains("sides="));

            let cmd = windows().build(Path::new("a.pdf"), None, &options);
            assert!(!joined(&cmd.invocation).contains("DuplexingMode"));
        }
    }

    #[test]
    fn a4_is_not_forwarded_other_sizes_are() {
        let a4 = PrintOptions {
            paper_size: Some(PaperSize::A4),
            ..Default::default()
        };
        let cmd = cups().build(Path::new("a.pdf"), None, &a4);
        assert!(!joined(&cmd.invocation).contains("media="));

        let letter = PrintOptions {
            paper_size: Some(PaperSize::Letter),
            ..Default::default()
        };
        let cmd = cups().build(Path::new("a.pdf"), None, &letter);
        assert!(joined(&cmd.invocation).contains("-o media=Letter"));

        let cmd = windows().build(Path::new("a.pdf"), Some("P1"), &letter);
        let script = joined(&cmd.invocation);
        assert!(script.contains("Set-PrintConfiguration -PrinterName 'P1' -PaperSize Letter"));
    }

    #[test]
    fn images_fit_to_page_on_cups() {
        let cmd = cups().build(Path::new("photo.JPG"), None, &PrintOptions::default());
        assert!(joined(&cmd.invocation).contains("-o fit-to-page"));

        let cmd = cups().build(Path::new("doc.pdf"), None, &PrintOptions::default());
        assert!(!joined(&cmd.invocation).contains("fit-to-page"));
    }

    #[test]
    fn windows_image_to_named_printer_uses_image_viewer() {
        let cmd = windows().build(
            Path::new(r"C:\uploads\scan.png"),
            Some("Front Desk"),
            &PrintOptions::default(),
        );
        let inv = &cmd.invocation;
        assert_eq!(inv.program, "rundll32.exe");
        assert_eq!(
            inv.args,
            vec![
                "shimgvw.dll,ImageView_PrintTo",
                "/pt",
                r"C:\uploads\scan.png",
                "Front Desk"
            ]
        );
    }

    #[test]
    fn windows_image_with_options_falls_back_to_powershell() {
        let options = PrintOptions {
            duplex: Some(DuplexMode::LongEdge),
            ..Default::default()
        };
        let cmd = windows().build(Path::new("scan.png"), Some("Front Desk"), &options);
        assert_eq!(cmd.invocation.program, "powershell.exe");
    }

    #[test]
    fn windows_default_printer_uses_print_verb() {
        let cmd = windows().build(Path::new(r"C:\u\a.pdf"), None, &PrintOptions::default());
        let inv = &cmd.invocation;
        assert_eq!(inv.program, "powershell.exe");
        let script = inv.args.last().expect("script");
        assert!(script.contains(r"Start-Process -FilePath 'C:\u\a.pdf' -Verb Print -Wait"));
        assert!(!script.contains("Set-PrintConfiguration"));
    }

    #[test]
    fn windows_named_printer_uses_print_to_verb() {
        let cmd = windows().build(Path::new("a.docx"), Some("HR Printer"), &PrintOptions::default());
        let script = cmd.invocation.args.last().expect("script").clone();
        assert!(script.contains(r#"-Verb PrintTo -ArgumentList '"HR Printer"'"#));
    }

    #[test]
    fn powershell_literals_escape_single_quotes() {
        assert_eq!(ps_quote("O'Brien's.pdf"), "'O''Brien''s.pdf'");
        let cmd = windows().build(Path::new("O'Brien.pdf"), None, &PrintOptions::default());
        assert!(cmd.invocation.args.last().expect("script").contains("'O''Brien.pdf'"));
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("lp").arg("-d").arg("Front Desk").arg("a.pdf");
        assert_eq!(spec.to_string(), "lp -d \"Front Desk\" a.pdf");
    }
}
