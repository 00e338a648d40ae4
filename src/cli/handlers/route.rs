//! Query inspection handlers: routing and date extraction.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output_json, print_header, print_hint, print_kv, yes_no, OutputMode};
use crate::services::{extract_date_tokens, route_by_query, DateToken, QueryCategory};

pub fn handle_route(query: &str, label: Option<&str>, mode: OutputMode) -> Result<()> {
    let decision = route_by_query(query, label);

    if mode == OutputMode::Json {
        output_json(&decision);
        return Ok(());
    }

    print_header(&format!("Route: {}", decision.category));
    print_kv("prompt key", &decision.prompt_key);
    print_kv("skip extraction", &yes_no(decision.skip_extraction));
    print_kv("skip inference", &yes_no(decision.skip_inference));
    print_kv("use raw source", &yes_no(decision.use_raw_source));
    print_kv("sort by timeline", &yes_no(decision.sort_by_timeline));
    print_kv("self-consistency", &yes_no(decision.enable_self_consistency));
    if let Some(label) = label {
        if QueryCategory::from_label(label).is_none() {
            print_hint(&format!("Label '{}' not recognized; routed by query text.", label));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct DateTokenView {
    token: String,
    granularity: &'static str,
}

fn granularity(token: &str) -> &'static str {
    match DateToken::parse(token) {
        Some(DateToken::Day(_)) => "day",
        Some(DateToken::Month { .. }) => "month",
        Some(DateToken::Year(_)) => "year",
        Some(DateToken::Invalid(_)) | None => "invalid",
    }
}

pub fn handle_dates(query: &str, mode: OutputMode) -> Result<()> {
    let tokens: Vec<DateTokenView> = extract_date_tokens(query)
        .into_iter()
        .map(|token| DateTokenView {
            granularity: granularity(&token),
            token,
        })
        .collect();

    if mode == OutputMode::Json {
        output_json(&tokens);
        return Ok(());
    }

    if tokens.is_empty() {
        print_hint("No date tokens found.");
        return Ok(());
    }
    print_header(&format!("Date tokens ({})", tokens.len()));
    for view in &tokens {
        print_kv(view.granularity, &view.token);
    }
    Ok(())
}
