use std::sync::Arc;
use std::time::Instant;

use partsdesk_agent::{AgentRuntime, RuntimeSettings};
use partsdesk_core::catalog::Catalog;
use partsdesk_core::config::{AgentMode, AppConfig, LoadOptions};
use partsdesk_core::domain::conversation::ChatRequest;
use partsdesk_core::domain::intent::IntentType;
use partsdesk_core::search::SearchService;
use serde::Serialize;

use crate::commands::{block_on, CommandResult, EXIT_SMOKE};

const OUT_OF_SCOPE_QUESTION: &str = "How do I fix my washing machine?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            let message = "configuration loaded and validated";
            checks.push(passed("config_validation", elapsed_ms, message));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(failed("config_validation", elapsed_ms, error.to_string()));
            checks.push(skipped("catalog_load"));
            checks.push(skipped("rules_pipeline"));
            checks.push(skipped("scope_guard"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let catalog = match timed_check(|| Catalog::load(&config.catalog)) {
        Ok((elapsed_ms, catalog)) if !catalog.is_empty() => {
            let message = format!("{} products loaded", catalog.len());
            checks.push(passed("catalog_load", elapsed_ms, message));
            Arc::new(catalog)
        }
        Ok((elapsed_ms, _)) => {
            checks.push(failed("catalog_load", elapsed_ms, "catalog has no products"));
            checks.push(skipped("rules_pipeline"));
            checks.push(skipped("scope_guard"));
            return finalize_report(checks, elapsed_since(started));
        }
        Err((elapsed_ms, error)) => {
            checks.push(failed("catalog_load", elapsed_ms, error.to_string()));
            checks.push(skipped("rules_pipeline"));
            checks.push(skipped("scope_guard"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    // Checks stay offline: rules mode, no LLM client.
    let settings =
        RuntimeSettings { mode: AgentMode::Rules, ..RuntimeSettings::from_config(&config) };
    let runtime = AgentRuntime::new(SearchService::new(Arc::clone(&catalog)), settings);

    let sample_part =
        catalog.products().first().map(|product| product.part_number.as_str().to_string());
    let pipeline_started = Instant::now();
    let question = format!("How can I install {}?", sample_part.as_deref().unwrap_or_default());
    match block_on("smoke", runtime.handle_message(ChatRequest::new(question))) {
        Ok(Ok(response))
            if response.intent.intent_type == IntentType::Installation
                && !response.products.is_empty() =>
        {
            checks.push(passed(
                "rules_pipeline",
                elapsed_since(pipeline_started),
                format!("installation answer produced for {}", sample_part.unwrap_or_default()),
            ));
        }
        Ok(Ok(response)) => checks.push(failed(
            "rules_pipeline",
            elapsed_since(pipeline_started),
            format!(
                "expected an installation answer with products, got `{}` with {} products",
                response.intent.intent_type.as_str(),
                response.products.len()
            ),
        )),
        Ok(Err(error)) => {
            let elapsed_ms = elapsed_since(pipeline_started);
            checks.push(failed("rules_pipeline", elapsed_ms, error.to_string()))
        }
        Err(result) => {
            checks.push(failed("rules_pipeline", elapsed_since(pipeline_started), result.output))
        }
    }

    let guard_started = Instant::now();
    match block_on("smoke", runtime.handle_message(ChatRequest::new(OUT_OF_SCOPE_QUESTION))) {
        Ok(Ok(response)) if response.intent.intent_type == IntentType::OutOfScope => {
            let message = "unsupported appliance declined";
            checks.push(passed("scope_guard", elapsed_since(guard_started), message));
        }
        Ok(Ok(response)) => checks.push(failed(
            "scope_guard",
            elapsed_since(guard_started),
            format!("expected out_of_scope, got `{}`", response.intent.intent_type.as_str()),
        )),
        Ok(Err(error)) => {
            checks.push(failed("scope_guard", elapsed_since(guard_started), error.to_string()))
        }
        Err(result) => {
            checks.push(failed("scope_guard", elapsed_since(guard_started), result.output))
        }
    }

    finalize_report(checks, elapsed_since(started))
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((elapsed_since(started), value)),
        Err(error) => Err((elapsed_since(started), error)),
    }
}

fn elapsed_since(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn passed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn failed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult {
        exit_code: if failed { EXIT_SMOKE } else { 0 },
        output: format!("{human}\n{machine}"),
    }
}
