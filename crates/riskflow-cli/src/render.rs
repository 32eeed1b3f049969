//! Plain-text rendering of wizard steps and service payloads.

use std::fmt::Write as _;

use riskflow_core::{
    AnalysisResult, DecisionView, DynamicSession, KnowledgeBase, KnowledgeFile, RiskRuleSet,
    ScanView, SessionSnapshot, StepView, VerificationTactic, WizardStep,
};

/// `[2/4] Generate tactics` plus the full step strip.
pub fn step_indicator(current: WizardStep) -> String {
    let strip: Vec<String> = WizardStep::ALL
        .iter()
        .map(|step| {
            let marker = if *step == current {
                "*"
            } else if step.ordinal() < current.ordinal() {
                "+"
            } else {
                " "
            };
            format!("[{marker}] {}", step.label())
        })
        .collect();

    format!(
        "Step {}/{}: {}\n{}",
        current.ordinal(),
        WizardStep::ALL.len(),
        current.label(),
        strip.join("  >  ")
    )
}

/// Render whatever the snapshot's step shows.
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = step_indicator(snapshot.step);
    out.push_str("\n\n");

    match StepView::new(snapshot.step, snapshot.result.as_ref()) {
        Some(StepView::Input) => {
            out.push_str("Enter the profile to analyse (age, job, income, family, ...).\n");
        }
        Some(StepView::Tactics(scan)) => out.push_str(&render_scan(&scan)),
        Some(StepView::Response { tactics }) => {
            out.push_str("Verification tactics\n");
            out.push_str(&render_tactics(&tactics));
        }
        Some(StepView::Result(decision)) => out.push_str(&render_decision(&decision)),
        None => out.push_str("(no analysis result)\n"),
    }
    out
}

pub fn render_scan(scan: &ScanView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Static risk score: {:.1} ({})",
        scan.score,
        scan.band.label()
    );
    let _ = writeln!(out, "Triggered rules: {}", scan.rule_count);

    for rule in scan.rules {
        let _ = write!(out, "  - {}", rule.rule_name);
        if let Some(value) = rule.risk_value {
            let _ = write!(out, " (+{value:.0})");
        }
        if let Some(method) = &rule.detection_method {
            let _ = write!(out, " [{}]", method.tag());
        }
        if !rule.keywords.is_empty() {
            let _ = write!(out, " keywords: {}", rule.keywords.join(", "));
        }
        out.push('\n');
    }

    if let Some(ai) = scan.ai_analysis {
        if !ai.risk_reasons.is_empty() {
            out.push_str("AI risk reasons:\n");
            for reason in &ai.risk_reasons {
                let _ = writeln!(out, "  - {reason}");
            }
        }
        if let Some(suggestions) = ai.suggestions() {
            out.push_str("AI verification suggestions:\n");
            for (i, suggestion) in suggestions.iter().enumerate() {
                let _ = writeln!(out, "  {}. {suggestion}", i + 1);
            }
        }
    }
    out
}

pub fn render_tactics(tactics: &[&VerificationTactic]) -> String {
    if tactics.is_empty() {
        return "  (none)\n".to_string();
    }

    let mut out = String::new();
    for (i, tactic) in tactics.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. [{}] {}: {}",
            i + 1,
            tactic.priority,
            tactic.rule_name,
            tactic.tactic
        );
        if let Some(note) = &tactic.knowledge {
            let _ = writeln!(out, "     note: {note}");
        }
    }
    out
}

pub fn render_decision(view: &DecisionView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total risk score: {:.1} ({})",
        view.total_score, view.risk_level
    );
    if let Some(verdict) = &view.verdict {
        let _ = writeln!(out, "Decision: {verdict}");
    }
    let _ = writeln!(
        out,
        "Static score: {:.1} (weight {:.0}%)",
        view.static_score,
        view.static_weight * 100.0
    );
    let _ = writeln!(
        out,
        "Dynamic score: {:.1} (weight {:.0}%)",
        view.dynamic_score,
        view.dynamic_weight * 100.0
    );

    out.push_str("Evidence:\n");
    for (i, line) in view.evidence.iter().enumerate() {
        let _ = writeln!(out, "  {}. {line}", i + 1);
    }

    if !view.tactics.is_empty() {
        out.push_str("Tactics used:\n");
        out.push_str(&render_tactics(&view.tactics));
    }
    out
}

/// One-shot rendering of a result outside the wizard.
pub fn render_result(result: &AnalysisResult) -> String {
    if result.decision.is_some() {
        render_decision(&DecisionView::new(result))
    } else {
        render_scan(&ScanView::new(result))
    }
}

pub fn render_dynamic(session: &DynamicSession) -> String {
    let mut out = String::new();
    let scores = [
        ("Fuzzy evasion", session.fuzzy_evasion),
        ("Emotional attack", session.emotional_attack),
        ("Topic shift", session.topic_shift),
        ("Precise answer", session.precise_answer),
        ("Overall risk", session.overall_risk_score),
    ];
    for (label, score) in scores {
        if let Some(score) = score {
            let _ = writeln!(out, "{label}: {score:.2}");
        }
    }
    if !session.risk_tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", session.risk_tags.join(", "));
    }
    out
}

pub fn render_rules(rules: &RiskRuleSet) -> String {
    let mut out = String::new();
    for (name, rule) in &rules.rules {
        let _ = writeln!(
            out,
            "{name}\trisk {:.0}\t{}",
            rule.risk_value,
            rule.trigger_words.join(", ")
        );
    }
    if out.is_empty() {
        out.push_str("(no rules)\n");
    }
    out
}

pub fn render_knowledge_file(file: &KnowledgeFile) -> String {
    format!(
        "{}\t{} rows\t{}\n",
        file.filename,
        file.rows,
        file.columns.join(", ")
    )
}

pub fn render_knowledge(base: &KnowledgeBase) -> String {
    if base.knowledge_files.is_empty() {
        return "(knowledge base is empty)\n".to_string();
    }
    base.knowledge_files
        .values()
        .map(render_knowledge_file)
        .collect()
}
