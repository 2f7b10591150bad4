// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer directory: asks the OS which printers are installed and which one
// is the default.
//
// Results are never cached: every call re-queries the print subsystem.  A
// failed query is logged and reported as "no printers" / "no default", since
// listing printers is advisory and must never break the caller.
//
// Windows is queried through PowerShell (`Get-Printer`, `Win32_Printer`);
// CUPS hosts through `lpstat`, forced to the C locale so the output can be
// parsed.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{Platform, PrinterInfo};

use crate::command::{CommandSpec, powershell};
use crate::executor::CommandExecutor;

const WINDOWS_LIST_SCRIPT: &str =
    "Get-Printer | Select-Object Name, PrinterStatus, Default | ConvertTo-Json";

const WINDOWS_DEFAULT_SCRIPT: &str =
    "(Get-CimInstance -ClassName Win32_Printer -Filter 'Default=TRUE').Name";

/// Queries the OS print subsystem for printers.
#[derive(Clone)]
pub struct PrinterDirectory {
    platform: Platform,
    executor: Arc<dyn CommandExecutor>,
}

impl PrinterDirectory {
    pub fn new(platform: Platform, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { platform, executor }
    }

    /// All installed printers.  Empty if the query fails.
    #[instrument(skip(self), fields(platform = ?self.platform))]
    pub async fn list_printers(&self) -> Vec<PrinterInfo> {
        match self.query_printers().await {
            Ok(printers) => {
                debug!(count = printers.len(), "printers listed");
                printers
            }
            Err(e) => {
                warn!(error = %e, "listing printers failed");
                Vec::new()
            }
        }
    }

    /// Name of the default printer, or `None` if there is none or the query
    /// fails.
    #[instrument(skip(self), fields(platform = ?self.platform))]
    pub async fn default_printer(&self) -> Option<String> {
        match self.query_default().await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "default printer lookup failed");
                None
            }
        }
    }

    async fn query_printers(&self) -> Result<Vec<PrinterInfo>> {
        match self.platform {
            Platform::Windows => {
                let stdout = self.run_query(powershell(WINDOWS_LIST_SCRIPT)).await?;
                parse_windows_printers(&stdout)
            }
            Platform::Cups => {
                let stdout = self.run_query(lpstat(&["-p", "-d"])).await?;
                Ok(parse_lpstat_printers(&stdout))
            }
        }
    }

    async fn query_default(&self) -> Result<Option<String>> {
        match self.platform {
            Platform::Windows => {
                let stdout = self.run_query(powershell(WINDOWS_DEFAULT_SCRIPT)).await?;
                let name = stdout.trim();
                Ok((!name.is_empty()).then(|| name.to_owned()))
            }
            Platform::Cups => {
                let stdout = self.run_query(lpstat(&["-d"])).await?;
                Ok(parse_lpstat_default(&stdout))
            }
        }
    }

    /// Run a query command and return its stdout, treating launch errors and
    /// non-zero exits as `PrinterQueryFailed`.
    async fn run_query(&self, spec: CommandSpec) -> Result<String> {
        let output = self.executor.run(&spec).await.map_err(|e| {
            PrintdropError::PrinterQueryFailed(format!("failed to launch {}: {e}", spec.program))
        })?;
        if !output.success() {
            return Err(PrintdropError::PrinterQueryFailed(format!(
                "{} {}",
                spec.program,
                output.failure_detail()
            )));
        }
        Ok(output.stdout)
    }
}

fn lpstat(args: &[&str]) -> CommandSpec {
    CommandSpec::new("lpstat").args(args.iter().copied()).env("LC_ALL", "C")
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WindowsPrinter {
    name: String,
    #[serde(default)]
    printer_status: Option<serde_json::Value>,
    #[serde(default)]
    default: Option<bool>,
}

/// `ConvertTo-Json` emits a bare object for one printer and an array for
/// several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<WindowsPrinter>),
    One(WindowsPrinter),
}

/// Parse the JSON produced by `Get-Printer | ConvertTo-Json`.
pub fn parse_windows_printers(stdout: &str) -> Result<Vec<PrinterInfo>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let printers = match serde_json::from_str::<OneOrMany>(trimmed)
        .map_err(|e| PrintdropError::PrinterQueryFailed(format!("unexpected Get-Printer output: {e}")))?
    {
        OneOrMany::Many(list) => list,
        OneOrMany::One(printer) => vec![printer],
    };

    Ok(printers
        .into_iter()
        .map(|p| PrinterInfo {
            name: p.name,
            status: windows_status(p.printer_status.as_ref()),
            is_default: p.default.unwrap_or(false),
        })
        .collect())
}

/// `PrinterStatus` arrives as the numeric enum value unless the shell has
/// formatted it as a string already.
fn windows_status(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(code) => windows_status_name(code).to_owned(),
            None => "Unknown".to_owned(),
        },
        _ => "Unknown".to_owned(),
    }
}

fn windows_status_name(code: i64) -> &'static str {
    match code {
        0 => "Normal",
        1 => "Paused",
        2 => "Error",
        3 => "PendingDeletion",
        4 => "PaperJam",
        5 => "PaperOut",
        6 => "ManualFeed",
        7 => "PaperProblem",
        8 => "Offline",
        9 => "IOActive",
        10 => "Busy",
        11 => "Printing",
        12 => "OutputBinFull",
        13 => "NotAvailable",
        14 => "Waiting",
        15 => "Processing",
        16 => "Initializing",
        17 => "WarmingUp",
        18 => "TonerLow",
        19 => "NoToner",
        20 => "PagePunt",
        21 => "UserIntervention",
        22 => "OutOfMemory",
        23 => "DoorOpen",
        _ => "Unknown",
    }
}

/// Parse `lpstat -p -d` output.
///
/// ```text
/// printer Office is idle.  enabled since Mon 06 Jan 2026 09:12:01
/// printer Label now printing Label-42.  enabled since ...
/// printer Old disabled since Tue 07 Jan 2026 -
/// system default destination: Office
/// ```
pub fn parse_lpstat_printers(stdout: &str) -> Vec<PrinterInfo> {
    let default = parse_lpstat_default(stdout);
    stdout
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("printer ")?;
            let (name, state) = rest.split_once(' ').unwrap_or((rest, ""));
            let status = if let Some(after_is) = state.strip_prefix("is ") {
                after_is
                    .split_whitespace()
                    .next()
                    .unwrap_or("unknown")
                    .trim_end_matches('.')
                    .to_owned()
            } else if state.starts_with("now printing") {
                "printing".to_owned()
            } else if state.starts_with("disabled") {
                "disabled".to_owned()
            } else {
                "unknown".to_owned()
            };
            Some(PrinterInfo {
                is_default: default.as_deref() == Some(name),
                name: name.to_owned(),
                status,
            })
        })
        .collect()
}

/// Extract the default destination from `lpstat -d` output.
pub fn parse_lpstat_default(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("system default destination:")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandOutput;
    use crate::test_support::ScriptedExecutor;

    const LPSTAT: &str = "\
printer Office is idle.  enabled since Mon 06 Jan 2026 09:12:01
printer Label now printing Label-42.  enabled since Mon 06 Jan 2026 09:12:01
printer Old disabled since Tue 07 Jan 2026 10:00:00 -
\treason unknown
system default destination: Office
";

    #[test]
    fn parses_lpstat_states_and_default() {
        let printers = parse_lpstat_printers(LPSTAT);
        assert_eq!(printers.len(), 3);
        assert_eq!(printers[0].name, "Office");
        assert_eq!(printers[0].status, "idle");
        assert!(printers[0].is_default);
        assert_eq!(printers[1].status, "printing");
        assert!(!printers[1].is_default);
        assert_eq!(printers[2].status, "disabled");
    }

    #[test]
    fn lpstat_without_default() {
        assert_eq!(parse_lpstat_default("no system default destination\n"), None);
        assert_eq!(
            parse_lpstat_default("system default destination: HP_M404\n").as_deref(),
            Some("HP_M404")
        );
    }

    #[test]
    fn parses_single_windows_printer_object() {
        let json = r#"{"Name":"Microsoft Print to PDF","PrinterStatus":0,"Default":true}"#;
        let printers = parse_windows_printers(json).expect("parse");
        assert_eq!(
            printers,
            vec![PrinterInfo {
                name: "Microsoft Print to PDF".into(),
                status: "Normal".into(),
                is_default: true,
            }]
        );
    }

    #[test]
    fn parses_windows_printer_array() {
        let json = r#"[
            {"Name":"Front Desk","PrinterStatus":8,"Default":false},
            {"Name":"Back Office","PrinterStatus":"Paused","Default":null}
        ]"#;
        let printers = parse_windows_printers(json).expect("parse");
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].status, "Offline");
        assert_eq!(printers[1].status, "Paused");
        assert!(!printers[1].is_default);
    }

    #[test]
    fn empty_windows_output_means_no_printers() {
        assert!(parse_windows_printers("  \r\n").expect("parse").is_empty());
    }

    #[test]
    fn garbage_windows_output_is_a_query_failure() {
        let err = parse_windows_printers("Get-Printer : access denied").unwrap_err();
        assert!(matches!(err, PrintdropError::PrinterQueryFailed(_)));
    }

    #[tokio::test]
    async fn list_uses_lpstat_in_c_locale() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(CommandOutput::ok(LPSTAT))]));
        let directory = PrinterDirectory::new(Platform::Cups, executor.clone());

        let printers = directory.list_printers().await;
        assert_eq!(printers.len(), 3);

        let calls = executor.calls();
        assert_eq!(calls[0].program, "lpstat");
        assert_eq!(calls[0].args, vec!["-p", "-d"]);
        assert!(calls[0].env.contains(&("LC_ALL".into(), "C".into())));
    }

    #[tokio::test]
    async fn list_failure_yields_empty() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(CommandOutput::failed(
            1,
            "lpstat: No destinations added.",
        ))]));
        let directory = PrinterDirectory::new(Platform::Cups, executor);
        assert!(directory.list_printers().await.is_empty());
    }

    #[tokio::test]
    async fn launch_failure_yields_empty_and_none() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Err(std::io::ErrorKind::NotFound),
            Err(std::io::ErrorKind::NotFound),
        ]));
        let directory = PrinterDirectory::new(Platform::Windows, executor);
        assert!(directory.list_printers().await.is_empty());
        assert_eq!(directory.default_printer().await, None);
    }

    #[tokio::test]
    async fn windows_default_is_trimmed() {
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Ok(CommandOutput::ok("Front Desk\r\n")),
            Ok(CommandOutput::ok("\r\n")),
        ]));
        let directory = PrinterDirectory::new(Platform::Windows, executor);
        assert_eq!(directory.default_printer().await.as_deref(), Some("Front Desk"));
        assert_eq!(directory.default_printer().await, None);
    }
}
