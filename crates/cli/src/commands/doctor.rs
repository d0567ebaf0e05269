use partsdesk_agent::OpenAiCompatibleClient;
use partsdesk_core::catalog::Catalog;
use partsdesk_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CATALOG, EXIT_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let first_failure = report.checks.iter().find(|check| check.status == CheckStatus::Fail);
    match first_failure.map(|check| check.name) {
        None => 0,
        Some("catalog_load") => EXIT_CATALOG,
        Some(_) => EXIT_CONFIG,
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_llm(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("catalog_load"));
            checks.push(skipped("llm_readiness"));
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let source = match &config.catalog.products_path {
        Some(path) => format!("`{}`", path.display()),
        None => "builtin seed".to_string(),
    };

    match Catalog::load(&config.catalog) {
        Ok(catalog) if catalog.is_empty() => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: format!("catalog from {source} has no products"),
        },
        Ok(catalog) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Pass,
            details: format!(
                "{} products and {} troubleshooting guides from {source}",
                catalog.len(),
                catalog.guides().len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

// Only validates that a client can be constructed; no request is sent.
fn check_llm(config: &AppConfig) -> DoctorCheck {
    if !config.llm.enabled {
        return DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Skipped,
            details: format!("llm disabled; agent runs in {} mode", config.agent.mode.as_str()),
        };
    }

    match OpenAiCompatibleClient::from_config(&config.llm) {
        Ok(_) => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "{} client ready for `{}` at {}",
                config.llm.provider.as_str(),
                config.llm.model,
                config.llm.effective_base_url()
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
