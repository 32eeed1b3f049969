//! Interactive wizard over stdin/stdout.
//!
//! Multi-line answers end with an empty line. `:reset` starts over from any
//! step and `:q` quits.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use riskflow_core::WizardStep;
use riskflow_runtime::{WizardController, WizardError};

use crate::render;

/// A line the user typed, classified.
enum Entry {
    Text(String),
    Reset,
    Quit,
}

/// Read until an empty line. A command on the first line wins.
fn read_block<R: BufRead>(input: &mut R) -> Result<Entry> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read stdin")? == 0 {
            return Ok(if lines.is_empty() {
                Entry::Quit
            } else {
                Entry::Text(lines.join("\n"))
            });
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if lines.is_empty() {
            match line.trim() {
                ":q" | ":quit" => return Ok(Entry::Quit),
                ":reset" => return Ok(Entry::Reset),
                _ => {}
            }
        }
        if line.trim().is_empty() {
            return Ok(Entry::Text(lines.join("\n")));
        }
        lines.push(line.to_string());
    }
}

/// Read a single confirmation line.
fn read_line<R: BufRead>(input: &mut R) -> Result<Entry> {
    let mut line = String::new();
    if input.read_line(&mut line).context("failed to read stdin")? == 0 {
        return Ok(Entry::Quit);
    }
    Ok(match line.trim() {
        ":q" | ":quit" => Entry::Quit,
        ":reset" => Entry::Reset,
        other => Entry::Text(other.to_string()),
    })
}

/// Drive `wizard` until the user quits or input ends.
pub async fn run<R, W>(wizard: &WizardController, mut input: R, mut output: W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    loop {
        let snapshot = wizard.snapshot();
        writeln!(output, "\n{}", render::render_snapshot(&snapshot))?;

        let prompt = match snapshot.step {
            WizardStep::Input => "Profile (end with an empty line):",
            WizardStep::Tactics => "Press Enter to generate verification tactics.",
            WizardStep::Response => "Counterpart response (end with an empty line):",
            WizardStep::Result => "Press Enter to start a new analysis.",
        };
        writeln!(output, "{prompt}")?;
        output.flush()?;

        let entry = match snapshot.step {
            WizardStep::Input | WizardStep::Response => read_block(&mut input)?,
            WizardStep::Tactics | WizardStep::Result => read_line(&mut input)?,
        };

        let text = match entry {
            Entry::Quit => return Ok(()),
            Entry::Reset => {
                wizard.reset();
                continue;
            }
            Entry::Text(text) => text,
        };

        let outcome = match snapshot.step {
            WizardStep::Input => {
                writeln!(output, "Scanning...")?;
                wizard.submit_static_scan(&text).await
            }
            WizardStep::Tactics => {
                writeln!(output, "Generating tactics...")?;
                wizard.request_tactics().await
            }
            WizardStep::Response => {
                writeln!(output, "Analysing response...")?;
                wizard.submit_user_response(&text).await
            }
            WizardStep::Result => Ok(wizard.reset()),
        };

        if let Err(err) = outcome {
            report(&mut output, &err)?;
        }
    }
}

fn report<W: Write>(output: &mut W, err: &WizardError) -> Result<()> {
    tracing::debug!(error = %err, retryable = err.is_retryable(), "Wizard action failed");
    writeln!(output, "! {}", err.user_message())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use async_trait::async_trait;
    use riskflow_core::{
        AiAnalysis, AnalysisResult, Decision, DynamicSession, HealthStatus, TriggeredRule,
        Verdict, VerificationTactic,
    };
    use riskflow_runtime::{AnalysisGateway, GatewayError};

    struct CannedGateway;

    #[async_trait]
    impl AnalysisGateway for CannedGateway {
        async fn static_scan(&self, _text: &str) -> Result<AnalysisResult, GatewayError> {
            Ok(AnalysisResult {
                score: Some(45.0),
                verification_tactics: vec![VerificationTactic {
                    rule_name: "职业".into(),
                    tactic: "询问公司全称".into(),
                    ..Default::default()
                }],
                ..Default::default()
            })
        }

        async fn generate_tactics(
            &self,
            _text: &str,
            _rules: &[TriggeredRule],
            _ai_analysis: &AiAnalysis,
        ) -> Result<AnalysisResult, GatewayError> {
            Err(GatewayError::Transport("not expected".into()))
        }

        async fn dynamic_analysis(&self, _text: &str) -> Result<DynamicSession, GatewayError> {
            Ok(DynamicSession::default())
        }

        async fn full_analysis(
            &self,
            _input_text: &str,
            user_response: &str,
        ) -> Result<AnalysisResult, GatewayError> {
            assert_eq!(user_response, "第一行\n第二行");
            Ok(AnalysisResult {
                decision: Some(Decision {
                    decision: Some(Verdict::Terminate),
                    total_score: Some(81.0),
                    ..Default::default()
                }),
                ..Default::default()
            })
        }

        async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
            Ok(HealthStatus::default())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    async fn drive(script: &str) -> (String, WizardController) {
        let wizard = WizardController::new(Arc::new(CannedGateway));
        let mut output = Vec::new();
        run(&wizard, Cursor::new(script.to_string()), &mut output)
            .await
            .unwrap();
        (String::from_utf8(output).unwrap(), wizard)
    }

    #[tokio::test]
    async fn test_full_walkthrough() {
        let (out, wizard) = drive("男，35岁\n\n\n第一行\n第二行\n\n:q\n").await;

        assert!(out.contains("Static risk score: 45.0 (medium risk)"));
        assert!(out.contains("询问公司全称"));
        assert!(out.contains("Total risk score: 81.0 (high risk)"));
        assert!(out.contains("Decision: TERMINATE"));
        assert_eq!(wizard.step(), WizardStep::Result);
    }

    #[tokio::test]
    async fn test_empty_profile_is_reported() {
        let (out, wizard) = drive("\n:q\n").await;
        assert!(out.contains("! Please enter the input text."));
        assert_eq!(wizard.step(), WizardStep::Input);
    }

    #[tokio::test]
    async fn test_reset_command_returns_to_input() {
        let (out, wizard) = drive("profile\n\n:reset\n").await;
        assert!(out.contains("Step 2/4"));
        assert_eq!(wizard.step(), WizardStep::Input);
        assert!(wizard.snapshot().input_text.is_empty());
    }
}
